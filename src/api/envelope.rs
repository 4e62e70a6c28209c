/// Response envelope returned by the remote-query capability
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Result key for data queries against the Airthings API.
pub const API_QUERY_TYPE: &str = "airthingsApi";

/// Per-query-type result: either an error message or a JSON payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub results: Option<HashMap<String, QueryResult>>,
}

impl ResponseEnvelope {
    /// Successful envelope carrying `meta` under the API query type.
    pub fn success(meta: Value) -> Self {
        Self::with_result(
            200,
            "OK",
            QueryResult {
                error: None,
                meta: Some(meta),
            },
        )
    }

    /// Envelope with a successful status but an error embedded in the keyed result.
    pub fn embedded_error(message: impl Into<String>) -> Self {
        Self::with_result(
            200,
            "OK",
            QueryResult {
                error: Some(message.into()),
                meta: None,
            },
        )
    }

    /// Envelope with a failing status and no payload.
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        ResponseEnvelope {
            status,
            status_text: status_text.into(),
            results: None,
        }
    }

    fn with_result(status: u16, status_text: &str, result: QueryResult) -> Self {
        let mut results = HashMap::new();
        results.insert(API_QUERY_TYPE.to_string(), result);
        ResponseEnvelope {
            status,
            status_text: status_text.to_string(),
            results: Some(results),
        }
    }

    /// Unpack the payload stored under `query_type`.
    ///
    /// A failing status or an embedded error becomes `Error::Remote`. An
    /// envelope with no `results` at all is an empty, successful result.
    pub fn into_payload(self, query_type: &str) -> Result<Value> {
        if self.status >= 400 {
            let message = if self.status_text.is_empty() {
                format!("Error status: {}", self.status)
            } else {
                self.status_text
            };
            return Err(Error::Remote(message));
        }

        let mut results = match self.results {
            Some(results) => results,
            None => return Ok(Value::Array(Vec::new())),
        };

        let result = results.remove(query_type).ok_or_else(|| {
            Error::Malformed(format!("Response has no result for '{}'", query_type))
        })?;

        if let Some(error) = result.error.filter(|e| !e.is_empty()) {
            return Err(Error::Remote(error));
        }

        Ok(result.meta.unwrap_or(Value::Null))
    }
}
