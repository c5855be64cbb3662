//! Catalog wire types and error definitions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Detail record served by `GET /product/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetail {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub availability: bool,
}

/// Body of `GET /product/{id}/similarids`.
pub type SimilarProductIds = Vec<String>;

/// Raw outcome of a single network attempt, before retry classification.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// Upstream answered with a non-2xx status.
    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Per-call time budget exceeded.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Could not establish a connection.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Anything else on the wire (body read, decode, protocol).
    #[error("transport error: {0}")]
    Transport(String),
}

impl CallError {
    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Client errors other than 429 are terminal; everything else may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self.status() {
            Some(status) => !((400..500).contains(&status) && status != 429),
            None => true,
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::Timeout(err.to_string())
        } else if err.is_connect() {
            CallError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            CallError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            CallError::Transport(err.to_string())
        }
    }
}

/// Classified failure surfaced to callers of the resilience stack.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Upstream reported the resource as missing (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Connection or time budget exceeded after retries.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Non-2xx response or transport failure after retries.
    #[error("external API error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ExternalApi { status: Option<u16>, message: String },

    /// Breaker short-circuited and no fallback was registered.
    #[error("circuit breaker [{dependency}] is open")]
    CircuitOpen { dependency: String },
}

impl UpstreamError {
    /// Convert an exhausted (or terminal) call failure into the public taxonomy.
    pub fn from_exhausted(target: &str, err: CallError) -> Self {
        match err {
            CallError::Timeout(_) | CallError::Connect(_) => {
                UpstreamError::Timeout(format!("request timeout for GET {target}"))
            }
            CallError::Status { status, body } => UpstreamError::ExternalApi {
                status: Some(status),
                message: format!("request to {target} failed with status {status}: {body}"),
            },
            CallError::Transport(message) => UpstreamError::ExternalApi {
                status: None,
                message: format!("request to {target} failed: {message}"),
            },
        }
    }

    /// Status carried by an `ExternalApi` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::ExternalApi { status, .. } => *status,
            UpstreamError::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
