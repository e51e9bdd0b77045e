use axum::{extract::FromRequestParts, http::request::Parts};

use super::envelope::ApiError;
use crate::model::EntityId;

/// Header set by the authenticating proxy in front of this service.
pub const CALLER_HEADER: &str = "x-user-id";

/// Authenticated caller identity. Rejects with 401 when the header is
/// missing or not a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub EntityId);

impl Caller {
    pub fn id(&self) -> String {
        self.0.to_string()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::unauthorized("authentication required"))?;
        EntityId::parse(raw, CALLER_HEADER)
            .map(Caller)
            .map_err(|_| ApiError::unauthorized("invalid caller identity"))
    }
}
