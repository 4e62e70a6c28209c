/// Error taxonomy shared by the API client, the aggregator and the binary
use thiserror::Error;

/// Every failure the crate can surface.
///
/// Variants carry owned strings rather than source errors so that a single
/// in-flight result can be cloned out to every coalesced caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The remote-query capability itself failed (connect, timeout, decode).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success envelope status, or an `error` field inside the keyed result.
    #[error("Remote error: {0}")]
    Remote(String),

    /// Payload was present but did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// A sample's bucket lies before the previous sample's bucket.
    #[error("Samples out of order: bucket {current} follows bucket {previous}")]
    UnsortedSamples { previous: i64, current: i64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Malformed(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
