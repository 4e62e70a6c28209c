use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use airthings_datasource::aggregation::{group_by_sum, interval::INTERVAL_1H};
use airthings_datasource::api::envelope::ResponseEnvelope;
use airthings_datasource::api::pagination::PageOptions;
use airthings_datasource::{
    AirthingsApi, Bucket, Datasource, Params, Query, QueryRequest, QueryType, RemoteQuery,
    Resolution, Result, Sample, SensorType, TimeRange,
};

// 2024-01-01 00:00:00 UTC
const T0: i64 = 1_704_067_200;

/// Answers device sample requests with a fixed payload and list requests with
/// pages of `page_sizes`. Yields once per call so concurrent callers overlap.
struct FakeAirthings {
    calls: AtomicUsize,
    page_sizes: Vec<usize>,
    samples: Value,
}

impl FakeAirthings {
    fn new(page_sizes: Vec<usize>, samples: Value) -> Self {
        FakeAirthings {
            calls: AtomicUsize::new(0),
            page_sizes,
            samples,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteQuery for FakeAirthings {
    async fn query(&self, endpoint: &str, params: &Params) -> Result<ResponseEnvelope> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        if endpoint.ends_with("/samples") {
            return Ok(ResponseEnvelope::success(self.samples.clone()));
        }

        let page = params.get("page").and_then(Value::as_u64).unwrap_or(1) as usize;
        let size = self.page_sizes.get(page - 1).copied().unwrap_or(0);
        let items: Vec<Value> = (0..size).map(|i| json!({ "id": format!("{}-{}", page, i) })).collect();
        Ok(ResponseEnvelope::success(Value::Array(items)))
    }
}

fn samples_payload() -> Value {
    json!({
        "data": {
            "time": [T0, T0 + 1800, T0 + 5000],
            "radonShortTermAvg": [10, 20, 30],
            "co2": [400, 410, 420]
        }
    })
}

fn radon_query() -> Query {
    Query {
        query_type: Some(QueryType::Devices),
        resource_id: Some("2930001234".to_string()),
        resource_name: "Basement".to_string(),
        sensor_type: Some(SensorType::Radon),
        resolution: Resolution::Hour,
    }
}

#[tokio::test]
async fn hourly_radon_series_is_gap_filled_to_range_end() {
    let remote = Arc::new(FakeAirthings::new(vec![], samples_payload()));
    let datasource = Datasource::new(AirthingsApi::new(remote.clone()));
    let request = QueryRequest {
        range: TimeRange::new(T0, T0 + 7200),
        targets: vec![radon_query()],
    };

    let series = datasource.query(&request).await.unwrap();

    assert_eq!(series.len(), 1);
    assert_eq!(series[0].target, "Basement - radonShortTermAvg");
    assert_eq!(
        series[0].datapoints,
        vec![
            Sample::new(30.0, T0 * 1000),
            Sample::new(30.0, (T0 + 3600) * 1000),
            Sample::new(None, (T0 + 7200) * 1000),
        ]
    );
}

#[tokio::test]
async fn concurrent_identical_queries_hit_the_api_once() {
    let remote = Arc::new(FakeAirthings::new(vec![], samples_payload()));
    let datasource = Datasource::new(AirthingsApi::new(remote.clone()));
    let request = QueryRequest {
        range: TimeRange::new(T0, T0 + 7200),
        targets: vec![radon_query()],
    };

    let (first, second) = tokio::join!(datasource.query(&request), datasource.query(&request));

    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(remote.calls(), 1);

    // Once settled, the next identical query goes back to the API
    datasource.query(&request).await.unwrap();
    assert_eq!(remote.calls(), 2);
}

#[tokio::test]
async fn pagination_stops_on_first_empty_page() {
    let remote = Arc::new(FakeAirthings::new(vec![200, 200, 50], Value::Null));
    let api = AirthingsApi::new(remote.clone());

    let organizations = api.get_organizations(PageOptions::default()).await.unwrap();

    assert_eq!(organizations.len(), 450);
    assert_eq!(remote.calls(), 4);
    assert_eq!(organizations[0]["id"], "1-0");
    assert_eq!(organizations[449]["id"], "3-49");
}

#[tokio::test]
async fn pagination_limit_keeps_whole_first_page() {
    let remote = Arc::new(FakeAirthings::new(vec![200, 200, 200], Value::Null));
    let api = AirthingsApi::new(remote.clone());

    let organizations = api
        .get_organizations(PageOptions::with_limit(200, 100))
        .await
        .unwrap();

    assert_eq!(organizations.len(), 200);
    assert_eq!(remote.calls(), 1);
}

#[test]
fn bucketed_output_reaggregates_to_itself() {
    let samples = vec![
        Sample::new(10.0, T0 * 1000),
        Sample::new(20.0, (T0 + 1800) * 1000),
        Sample::new(30.0, (T0 + 5000) * 1000),
    ];
    let range = TimeRange::new(T0, T0 + 7200);

    let buckets = group_by_sum(&samples, &range, INTERVAL_1H).unwrap();
    let again: Vec<Bucket> = group_by_sum(
        &buckets.iter().copied().map(Sample::from).collect::<Vec<_>>(),
        &range,
        INTERVAL_1H,
    )
    .unwrap();

    assert_eq!(buckets, again);
}
