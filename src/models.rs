use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One raw reading: a possibly-missing value at a millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: Option<f64>,
    pub timestamp_ms: i64,
}

impl Sample {
    pub fn new(value: impl Into<Option<f64>>, timestamp_ms: i64) -> Self {
        Sample {
            value: value.into(),
            timestamp_ms,
        }
    }
}

/// One aggregated time window. `value` is `None` when no sample landed in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub value: Option<f64>,
    pub start_ms: i64,
}

impl Bucket {
    pub fn new(value: impl Into<Option<f64>>, start_ms: i64) -> Self {
        Bucket {
            value: value.into(),
            start_ms,
        }
    }
}

impl From<Bucket> for Sample {
    fn from(bucket: Bucket) -> Self {
        Sample::new(bucket.value, bucket.start_ms)
    }
}

/// Query window in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    pub fn new(from: i64, to: i64) -> Self {
        TimeRange { from, to }
    }

    pub fn start_ms(&self) -> i64 {
        self.from * 1000
    }

    pub fn end_ms(&self) -> i64 {
        self.to * 1000
    }

    pub fn span_secs(&self) -> i64 {
        self.to - self.from
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    #[serde(rename = "temp")]
    Temp,
    #[serde(rename = "radonShortTermAvg")]
    Radon,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "pressure")]
    Pressure,
    #[serde(rename = "voc")]
    Tvoc,
    #[serde(rename = "co2")]
    Co2,
    #[serde(rename = "light")]
    Light,
    /// Every sensor present in the response.
    #[serde(rename = "all")]
    All,
}

impl SensorType {
    /// Key used by the API payload for this sensor.
    pub fn key(&self) -> &'static str {
        match self {
            SensorType::Temp => "temp",
            SensorType::Radon => "radonShortTermAvg",
            SensorType::Humidity => "humidity",
            SensorType::Pressure => "pressure",
            SensorType::Tvoc => "voc",
            SensorType::Co2 => "co2",
            SensorType::Light => "light",
            SensorType::All => "all",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SensorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "temp" => Ok(SensorType::Temp),
            "radonShortTermAvg" | "radon" => Ok(SensorType::Radon),
            "humidity" => Ok(SensorType::Humidity),
            "pressure" => Ok(SensorType::Pressure),
            "voc" => Ok(SensorType::Tvoc),
            "co2" => Ok(SensorType::Co2),
            "light" => Ok(SensorType::Light),
            "all" => Ok(SensorType::All),
            other => Err(Error::Config(format!("Unknown sensor type '{}'", other))),
        }
    }
}

/// Display resolution selected for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "")]
    Full,
    #[serde(rename = "HOUR")]
    Hour,
    #[serde(rename = "DAY")]
    Day,
    #[serde(rename = "WEEK")]
    Week,
}

impl Resolution {
    /// Value sent as the `resolution` request parameter. Full resolution sends nothing.
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Resolution::Full => None,
            Resolution::Hour => Some("HOUR"),
            Resolution::Day => Some("DAY"),
            Resolution::Week => Some("WEEK"),
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "" | "FULL" => Ok(Resolution::Full),
            "HOUR" => Ok(Resolution::Hour),
            "DAY" => Ok(Resolution::Day),
            "WEEK" => Ok(Resolution::Week),
            other => Err(Error::Config(format!("Unknown resolution '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryType {
    Devices,
    Locations,
}

/// One dashboard target. Targets missing a query type, resource or sensor are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub query_type: Option<QueryType>,
    pub resource_id: Option<String>,
    pub resource_name: String,
    pub sensor_type: Option<SensorType>,
    #[serde(default)]
    pub resolution: Resolution,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub range: TimeRange,
    pub targets: Vec<Query>,
}

/// Named series handed back to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub target: String,
    pub datapoints: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub status: Status,
    pub message: String,
}
