/// Airthings API client: remote-query capability, coalescing and pagination
pub mod coalesce;
pub mod envelope;
pub mod http;
pub mod pagination;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{Resolution, TimeRange};
use coalesce::Coalescer;
use envelope::{ResponseEnvelope, API_QUERY_TYPE};
use pagination::{fetch_all_pages, PageOptions};

/// Request parameters. Ordered so that equal parameter sets encode identically.
pub type Params = BTreeMap<String, Value>;

/// Opaque network capability: one request to one endpoint.
#[async_trait]
pub trait RemoteQuery: Send + Sync {
    async fn query(&self, endpoint: &str, params: &Params) -> Result<ResponseEnvelope>;
}

const TSDB_REQUEST: &str = "tsdb_request";

/// Client for one datasource instance. Owns its own in-flight call registry.
#[derive(Clone)]
pub struct AirthingsApi {
    remote: Arc<dyn RemoteQuery>,
    calls: Coalescer<Value>,
}

impl AirthingsApi {
    pub fn new(remote: Arc<dyn RemoteQuery>) -> Self {
        AirthingsApi {
            remote,
            calls: Coalescer::new(),
        }
    }

    /// Number of remote calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.in_flight()
    }

    /// Query `endpoint` and unpack the envelope. Identical concurrent
    /// requests share a single remote call.
    pub async fn tsdb_request(&self, endpoint: &str, params: &Params) -> Result<Value> {
        let remote = Arc::clone(&self.remote);
        let owned_endpoint = endpoint.to_string();
        let owned_params = params.clone();

        self.calls
            .call(TSDB_REQUEST, &(endpoint, params), move || async move {
                remote
                    .query(&owned_endpoint, &owned_params)
                    .await?
                    .into_payload(API_QUERY_TYPE)
            })
            .await
    }

    /// Fetch every page of a list endpoint, see [`fetch_all_pages`].
    pub async fn request_with_pagination(
        &self,
        endpoint: &str,
        params: &Params,
        options: PageOptions,
    ) -> Result<Vec<Value>> {
        fetch_all_pages(params, options, |page_params| async move {
            let payload = self.tsdb_request(endpoint, &page_params).await?;
            page_items(payload)
        })
        .await
    }

    pub async fn get_organizations(&self, options: PageOptions) -> Result<Vec<Value>> {
        self.request_with_pagination("organizations", &Params::new(), options)
            .await
    }

    pub async fn get_devices(&self) -> Result<Value> {
        self.tsdb_request("devices", &Params::new()).await
    }

    pub async fn get_locations(&self) -> Result<Value> {
        self.tsdb_request("locations", &Params::new()).await
    }

    /// Samples of one device over `range`, at the API-side `resolution`.
    pub async fn get_device_samples(
        &self,
        device_id: &str,
        resolution: Resolution,
        range: &TimeRange,
    ) -> Result<Value> {
        let mut params = Params::new();
        params.insert("start".to_string(), json!(range.from));
        params.insert("end".to_string(), json!(range.to));
        if let Some(resolution) = resolution.as_param() {
            params.insert("resolution".to_string(), json!(resolution));
        }
        self.tsdb_request(&format!("devices/{}/samples", device_id), &params)
            .await
    }

    pub async fn get_location_latest_samples(
        &self,
        location_id: &str,
        options: PageOptions,
    ) -> Result<Vec<Value>> {
        self.request_with_pagination(
            &format!("locations/{}/latest-samples", location_id),
            &Params::new(),
            options,
        )
        .await
    }
}

/// Items of one page. Accepts a bare array, or an object wrapping exactly one
/// array (`{"devices": [...]}`); null is an empty page.
fn page_items(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        Value::Object(fields) => {
            let mut arrays = fields.into_iter().filter_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            });
            match (arrays.next(), arrays.next()) {
                (Some(items), None) => Ok(items),
                _ => Err(Error::Malformed(
                    "Page object must wrap exactly one list".to_string(),
                )),
            }
        }
        other => Err(Error::Malformed(format!(
            "Expected a list page, got {}",
            other
        ))),
    }
}
