//! Airthings environmental sensor datasource.
//!
//! Fetches radon, CO2, temperature and other sensor samples from the
//! Airthings cloud API and reshapes them into gap-filled time series:
//!
//! - [`aggregation`] regroups irregular samples into hour/day/week/month buckets
//! - [`api`] talks to the API, coalescing identical in-flight requests and
//!   walking paginated endpoints
//! - [`datasource`] turns dashboard targets into one named series per sensor

pub mod aggregation;
pub mod api;
pub mod config;
pub mod datasource;
pub mod error;
pub mod models;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{AirthingsApi, Params, RemoteQuery};
pub use datasource::Datasource;
pub use error::{Error, Result};
pub use models::{Bucket, Query, QueryRequest, QueryType, Resolution, Sample, SensorType, Series, TimeRange};
