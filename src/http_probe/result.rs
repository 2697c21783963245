use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

/// Response metadata plus the complete body of one fetch.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

/// Failure of a single fetch. The `Display` text is what ends up in the
/// `error` field of a failed record.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("dial timeout after {}ms", .timeout.as_millis())]
    DialTimeout { timeout: Duration },

    #[error("{0}")]
    Request(String),

    #[error("reading response body: {0}")]
    Body(String),
}
