//! Error types for ferry-s3.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An error document returned by the service.
    #[error("{code} (HTTP {status}): {message}")]
    Service { status: u16, code: String, message: String },

    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("response is missing {0}")]
    MissingField(&'static str),

    #[error("presigned URL lifetime must be between 1 second and 7 days, got {0:?}")]
    InvalidTtl(Duration),

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("invalid signing key: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Convert into the engine's error, naming the store operation that
    /// failed. Caller mistakes become `Config`; everything else is `Backend`.
    pub fn into_transfer(self, op: &'static str) -> ferry_transfer::Error {
        match self {
            Error::InvalidTtl(_) | Error::InvalidEndpoint { .. } => ferry_transfer::Error::Config(self.to_string()),
            other => ferry_transfer::Error::backend(op, other),
        }
    }
}
