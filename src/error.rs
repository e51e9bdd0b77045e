#![forbid(unsafe_code)]

//! Error kinds surfaced by every core operation.

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A reference that does not parse as an entity id.
    #[error("{0}")]
    InvalidIdentifier(String),

    /// A missing, empty or out-of-whitelist argument.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// The caller is not the owner/authorized party.
    #[error("{0}")]
    Forbidden(String),

    /// The entity store or the asset store failed.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// A write looked successful but the follow-up read disagreed.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    pub fn invalid_id(field: &str) -> Self {
        Self::InvalidIdentifier(format!("Invalid {field}"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidIdentifier(_) | Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<libsql::Error> for CoreError {
    fn from(err: libsql::Error) -> Self {
        Self::UpstreamFailure(format!("entity store: {err}"))
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::UpstreamFailure(format!("asset store: {err}"))
    }
}

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        Self::UpstreamFailure(format!("{err:#}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

/// One best-effort cleanup step that did not complete.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CleanupFailure {
    pub step: String,
    pub message: String,
}

impl CleanupFailure {
    pub fn new(step: impl Into<String>, err: &CoreError) -> Self {
        Self {
            step: step.into(),
            message: err.to_string(),
        }
    }
}
