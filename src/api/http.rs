/// reqwest-backed remote query against the Airthings REST API
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::envelope::ResponseEnvelope;
use super::{Params, RemoteQuery};
use crate::error::{Error, Result};

pub const AIRTHINGS_API_URL: &str = "https://ext-api.airthings.com/v1";

pub struct HttpRemote {
    client: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl HttpRemote {
    pub fn new(base_url: Url, access_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, access_token))
    }

    /// Use a preconfigured client, e.g. with custom proxy or TLS settings.
    pub fn with_client(client: reqwest::Client, base_url: Url, access_token: impl Into<String>) -> Self {
        HttpRemote {
            client,
            base_url,
            access_token: access_token.into(),
        }
    }

    /// Build `{base}/{endpoint}?{params}`. String values are sent verbatim,
    /// other JSON values in their JSON text form; nulls are left out.
    pub fn endpoint_url(&self, endpoint: &str, params: &Params) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {}", endpoint, e)))?;

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                match value {
                    Value::Null => {}
                    Value::String(s) => {
                        query.append_pair(key, s);
                    }
                    other => {
                        query.append_pair(key, &other.to_string());
                    }
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }
}

#[async_trait]
impl RemoteQuery for HttpRemote {
    async fn query(&self, endpoint: &str, params: &Params) -> Result<ResponseEnvelope> {
        let url = self.endpoint_url(endpoint, params)?;
        debug!("Airthings API query: {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Reported inside the envelope, the way the backend forwards API errors
            return Ok(ResponseEnvelope::embedded_error(format!(
                "Error status: {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        Ok(ResponseEnvelope::success(body))
    }
}
