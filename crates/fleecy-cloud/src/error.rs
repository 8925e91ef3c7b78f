//! Collaborator transport and decode errors.

use std::time::Duration;

use thiserror::Error;

use fleecy_core::ConfigError;
use fleecy_selection::CollaboratorError;

#[derive(Debug, Error)]
pub enum CloudError {
    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("unsupported URL scheme {0:?}: only http is supported")]
    UnsupportedScheme(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP exchange with {uri} failed: {source}")]
    Http {
        uri: String,
        #[source]
        source: hyper::Error,
    },

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("request to {uri} timed out after {timeout:?}")]
    Timeout { uri: String, timeout: Duration },

    #[error("{uri} returned {status}: {body}")]
    Status { uri: String, status: u16, body: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to decode response from {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected payload: {0}")]
    Malformed(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type CloudResult<T> = Result<T, CloudError>;

impl From<CloudError> for CollaboratorError {
    fn from(err: CloudError) -> Self {
        match err {
            CloudError::Auth(_) => CollaboratorError::Unauthorized(err.to_string()),
            CloudError::Status { status: 401 | 403, .. } => CollaboratorError::Unauthorized(err.to_string()),
            CloudError::Status { status, body, .. } => CollaboratorError::Status { status, message: body },
            CloudError::Decode { .. } | CloudError::Malformed(_) => {
                CollaboratorError::Malformed(err.to_string())
            }
            CloudError::NoData(msg) => CollaboratorError::NoData(msg),
            _ => CollaboratorError::Unreachable(err.to_string()),
        }
    }
}
