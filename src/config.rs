use log::{debug, info};
use std::collections::BTreeMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::api::http::AIRTHINGS_API_URL;
use crate::api::pagination::DEFAULT_PER_PAGE;
use crate::error::{Error, Result};
use crate::models::{Resolution, SensorType};

const DEFAULT_WINDOW_SECS: u64 = 86_400; // 24 hours
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300; // 5 minutes
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct DatasourceConfig {
    pub api_url: Url,
    pub access_token: String,
    /// Device serial number -> display name
    pub devices: BTreeMap<String, String>,
    pub sensor: SensorType,
    pub resolution: Resolution,
    pub per_page: usize,
    pub window: Duration,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl DatasourceConfig {
    pub fn new() -> Result<Self> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Build the configuration from `(name, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let api_url = get("AIRTHINGS_API_URL").unwrap_or(AIRTHINGS_API_URL);
        let api_url = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("Invalid AIRTHINGS_API_URL '{}': {}", api_url, e)))?;

        let access_token = get("AIRTHINGS_ACCESS_TOKEN")
            .ok_or_else(|| {
                Error::Config("AIRTHINGS_ACCESS_TOKEN environment variable not set".to_string())
            })?
            .to_string();

        let mut devices = BTreeMap::new();

        // Try AIRTHINGS_DEVICES format first
        if let Some(list) = get("AIRTHINGS_DEVICES") {
            debug!("Found AIRTHINGS_DEVICES: '{}'", list);
            for pair in list.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                match pair.split_once('=') {
                    Some((id, name)) => {
                        let id = id.trim();
                        let name = name.trim();
                        if !id.is_empty() && !name.is_empty() {
                            devices.insert(id.to_string(), name.to_string());
                        }
                    }
                    None => debug!("Failed to split pair: '{}'", pair),
                }
            }
        } else {
            // Fallback to individual environment variables
            debug!("AIRTHINGS_DEVICES not found, trying individual variables");
            for (key, value) in &vars {
                if let Some(index) = key
                    .strip_prefix("AIRTHINGS_DEVICE_")
                    .and_then(|s| s.strip_suffix("_ID"))
                {
                    let name_key = format!("AIRTHINGS_DEVICE_{}_NAME", index);
                    if let Some(name) = get(&name_key) {
                        devices.insert(value.trim().to_string(), name.to_string());
                    }
                }
            }
        }

        if devices.is_empty() {
            return Err(Error::Config("No Airthings devices configured. Please set AIRTHINGS_DEVICES or AIRTHINGS_DEVICE_<N>_ID/AIRTHINGS_DEVICE_<N>_NAME environment variables".to_string()));
        }

        info!("Total devices loaded: {}", devices.len());
        for (id, name) in &devices {
            debug!("Device: {} -> {}", id, name);
        }

        let sensor = match get("AIRTHINGS_SENSOR") {
            Some(value) => SensorType::from_str(value)?,
            None => SensorType::All,
        };

        // An explicitly empty resolution means full resolution
        let resolution = match vars.get("AIRTHINGS_RESOLUTION") {
            Some(value) => Resolution::from_str(value)?,
            None => Resolution::Hour,
        };

        let number = |key: &str, default: u64| -> Result<u64> {
            match get(key) {
                Some(value) => value
                    .parse()
                    .map_err(|e| Error::Config(format!("Invalid {} '{}': {}", key, value, e))),
                None => Ok(default),
            }
        };

        Ok(DatasourceConfig {
            api_url,
            access_token,
            devices,
            sensor,
            resolution,
            per_page: number("AIRTHINGS_PER_PAGE", DEFAULT_PER_PAGE as u64)? as usize,
            window: Duration::from_secs(number("AIRTHINGS_WINDOW_SECS", DEFAULT_WINDOW_SECS)?),
            poll_interval: Duration::from_secs(number(
                "AIRTHINGS_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            http_timeout: Duration::from_secs(number(
                "AIRTHINGS_HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
        })
    }
}
