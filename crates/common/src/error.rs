use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Platform resources that can be resolved by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Org,
    Space,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Org => write!(f, "org"),
            ResourceKind::Space => write!(f, "space"),
        }
    }
}

/// Failures raised while talking to the platform, the token issuer or the
/// notification service.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} expected to return HTTP 200, got {status}. Body: {body}")]
    ServerError {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} expected to return HTTP 200, got 404 (unknown route). Body: {body}")]
    UnknownRoute { service: &'static str, body: String },

    #[error("{service} expected to return HTTP 200, got 401. Body: {body}")]
    Unauthorized { service: &'static str, body: String },

    #[error("{service} expected to return HTTP 200, got 403. Body: {body}")]
    Forbidden { service: &'static str, body: String },

    #[error("{service} expected to return HTTP 200, got {status}. Body: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("CF {kind} not found: '{name}'")]
    ResourceNotFound { kind: ResourceKind, name: String },

    #[error("{service} response not parseable: {reason}")]
    UnparseableResponse {
        service: &'static str,
        reason: String,
    },

    #[error("giving up on {service} after {attempts} attempts in {elapsed:?}: {source}")]
    RetriesExhausted {
        service: &'static str,
        attempts: u32,
        elapsed: Duration,
        #[source]
        source: Box<AlertError>,
    },

    #[error("sending service alert timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AlertError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AlertError::Network { .. } | AlertError::ServerError { .. } | AlertError::UnknownRoute { .. }
        )
    }

    /// Whether the failure came from reaching a remote service at all, rather
    /// than from a definite answer it gave. Exhausted retries count when the
    /// last error did, and so does the global deadline.
    pub fn is_network_related(&self) -> bool {
        match self {
            AlertError::RetriesExhausted { source, .. } => source.is_network_related(),
            AlertError::Timeout(_) => true,
            other => other.is_retryable(),
        }
    }

    /// Number of attempts recorded on a give-up error, if any.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            AlertError::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
