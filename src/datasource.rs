/// Dashboard query handling: fetch per target, reshape into named series
use log::{debug, error};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::aggregation::{group_by_time, sum, Interval};
use crate::api::pagination::PageOptions;
use crate::api::AirthingsApi;
use crate::error::{Error, Result};
use crate::models::{
    ConnectionStatus, Query, QueryRequest, QueryType, Sample, SensorType, Series, Status,
    TimeRange,
};

const TIME_KEY: &str = "time";

pub struct Datasource {
    api: AirthingsApi,
    page_options: PageOptions,
}

impl Datasource {
    pub fn new(api: AirthingsApi) -> Self {
        Datasource {
            api,
            page_options: PageOptions::default(),
        }
    }

    pub fn with_page_size(mut self, per_page: usize) -> Self {
        self.page_options.per_page = per_page;
        self
    }

    /// Run every complete target of `request`, in order, and collect their series.
    ///
    /// Targets without a query type, resource or sensor are skipped. The
    /// first failing target fails the whole request.
    pub async fn query(&self, request: &QueryRequest) -> Result<Vec<Series>> {
        let mut data = Vec::new();

        for target in &request.targets {
            let (query_type, resource_id, sensor) = match (
                target.query_type,
                target.resource_id.as_deref(),
                target.sensor_type,
            ) {
                (Some(query_type), Some(resource_id), Some(sensor)) => {
                    (query_type, resource_id, sensor)
                }
                _ => {
                    debug!("Skipping incomplete target {:?}", target);
                    continue;
                }
            };

            let series = match query_type {
                QueryType::Devices => {
                    self.query_device(target, resource_id, sensor, &request.range)
                        .await?
                }
                QueryType::Locations => {
                    self.query_location(target, resource_id, sensor).await?
                }
            };
            data.extend(series);
        }

        Ok(data)
    }

    async fn query_device(
        &self,
        target: &Query,
        device_id: &str,
        sensor: SensorType,
        range: &TimeRange,
    ) -> Result<Vec<Series>> {
        let payload = self
            .api
            .get_device_samples(device_id, target.resolution, range)
            .await?;
        let series = parse_selected_sensor_samples(&target.resource_name, sensor, &payload)?;

        match Interval::for_resolution(target.resolution) {
            Some(strategy) => series
                .into_iter()
                .map(|s| bucket_series(s, range, &strategy))
                .collect(),
            None => Ok(series),
        }
    }

    async fn query_location(
        &self,
        target: &Query,
        location_id: &str,
        sensor: SensorType,
    ) -> Result<Vec<Series>> {
        let items = self
            .api
            .get_location_latest_samples(location_id, self.page_options)
            .await?;
        parse_latest_samples(&target.resource_name, sensor, &items)
    }

    /// Check that the API answers, with a minimal organizations listing.
    pub async fn test_connection(&self) -> ConnectionStatus {
        match self
            .api
            .get_organizations(PageOptions::with_limit(2, 2))
            .await
        {
            Ok(_) => ConnectionStatus {
                status: Status::Success,
                message: "Data source is working".to_string(),
            },
            Err(e) => {
                error!("Connection test failed: {}", e);
                ConnectionStatus {
                    status: Status::Error,
                    message: "Cannot connect to Airthings API".to_string(),
                }
            }
        }
    }
}

fn series_name(resource_name: &str, sensor_key: &str) -> String {
    format!("{} - {}", resource_name, sensor_key)
}

fn bucket_series(series: Series, range: &TimeRange, strategy: &Interval) -> Result<Series> {
    let buckets = group_by_time(&series.datapoints, range, strategy, sum)?;
    Ok(Series {
        target: series.target,
        datapoints: buckets.into_iter().map(Sample::from).collect(),
    })
}

/// Keys of the sensors to emit, in payload key order. `All` selects every
/// list-valued key except `time`.
fn selected_sensors(sensor: SensorType, data: &Map<String, Value>) -> Vec<String> {
    match sensor {
        SensorType::All => data
            .iter()
            .filter(|(key, value)| key.as_str() != TIME_KEY && value.is_array())
            .map(|(key, _)| key.clone())
            .collect(),
        other => vec![other.key().to_string()],
    }
}

/// Turn a device samples payload (`{"data": {"time": [...], "<sensor>": [...]}}`)
/// into one series per selected sensor. Timestamps arrive in seconds and
/// leave in milliseconds; values and timestamps are paired by position.
///
/// An empty result (`null` or `[]`, what an envelope without results
/// unpacks to) yields no series.
pub fn parse_selected_sensor_samples(
    resource_name: &str,
    sensor: SensorType,
    payload: &Value,
) -> Result<Vec<Series>> {
    let empty = match payload {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        _ => false,
    };
    if empty {
        debug!("No samples for {}", resource_name);
        return Ok(Vec::new());
    }

    let data = payload
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::Malformed("Samples response has no 'data' object".to_string()))?;

    let timestamps: Vec<i64> = match data.get(TIME_KEY) {
        Some(Value::Array(times)) => times
            .iter()
            .map(|t| {
                t.as_i64()
                    .map(|secs| secs * 1000)
                    .ok_or_else(|| Error::Malformed(format!("Invalid sample time {}", t)))
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(Error::Malformed(format!(
                "Sample times must be a list, got {}",
                other
            )))
        }
        None => Vec::new(),
    };

    let series = selected_sensors(sensor, data)
        .into_iter()
        .map(|key| {
            let datapoints = match data.get(&key) {
                Some(Value::Array(values)) => values
                    .iter()
                    .zip(&timestamps)
                    .map(|(value, ts)| Sample::new(value.as_f64(), *ts))
                    .collect(),
                _ => Vec::new(),
            };
            Series {
                target: series_name(resource_name, &key),
                datapoints,
            }
        })
        .collect();

    Ok(series)
}

/// Merge latest-sample items (one per device) into one series per sensor,
/// each point stamped with its device's sample time.
pub fn parse_latest_samples(
    resource_name: &str,
    sensor: SensorType,
    items: &[Value],
) -> Result<Vec<Series>> {
    let mut by_sensor: BTreeMap<String, Vec<Sample>> = BTreeMap::new();

    for item in items {
        let data = item
            .get("data")
            .unwrap_or(item)
            .as_object()
            .ok_or_else(|| Error::Malformed(format!("Latest sample is not an object: {}", item)))?;

        let timestamp_ms = match data.get(TIME_KEY).and_then(Value::as_i64) {
            Some(secs) => secs * 1000,
            None => {
                debug!("Skipping latest sample without time");
                continue;
            }
        };

        let keys: Vec<&String> = match sensor {
            SensorType::All => data
                .iter()
                .filter(|(key, value)| key.as_str() != TIME_KEY && value.is_number())
                .map(|(key, _)| key)
                .collect(),
            other => data.keys().filter(|key| key.as_str() == other.key()).collect(),
        };

        for key in keys {
            by_sensor
                .entry(key.clone())
                .or_default()
                .push(Sample::new(data[key].as_f64(), timestamp_ms));
        }
    }

    Ok(by_sensor
        .into_iter()
        .map(|(key, mut datapoints)| {
            datapoints.sort_by_key(|s| s.timestamp_ms);
            Series {
                target: series_name(resource_name, &key),
                datapoints,
            }
        })
        .collect())
}
