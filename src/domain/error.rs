//! Failure taxonomy for the refresh pipeline
//!
//! Every store refresh terminates in either a committed catalog or one of
//! these structured failures. Only the auth class is ever retried, and
//! only once, by the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire-level failure from the search API client
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SearchError {
    #[error("Search API returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Response decode failure: {0}")]
    Decode(String),
}

impl SearchError {
    /// HTTP status carried by this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Terminal failure classes for a single-store refresh
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum RefreshError {
    #[error("Credential extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Authentication rejected with HTTP {status}")]
    Auth { status: u16 },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Upstream returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Catalog commit failed: {0}")]
    CommitFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RefreshError {
    /// True for the auth class that is allowed one credential retry
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// HTTP status carried by this failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status } | Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<SearchError> for RefreshError {
    /// Classify a wire failure: 401/403 become the retryable auth class,
    /// every other HTTP status stays a terminal upstream error.
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Http { status, message } => {
                if is_auth_status(status) {
                    Self::Auth { status }
                } else {
                    Self::Http { status, message }
                }
            }
            SearchError::Network(msg) => Self::Network(msg),
            SearchError::Decode(msg) => Self::Network(format!("decode: {msg}")),
        }
    }
}

/// Pure predicate for auth-class HTTP statuses
pub fn is_auth_status(status: u16) -> bool {
    status == 401 || status == 403
}
