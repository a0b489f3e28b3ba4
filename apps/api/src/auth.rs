//! Caller identity supplied by the authentication gateway.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;

/// Header the gateway sets to the authenticated user's stable id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user. Extracting it fails with 401 before any body is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        Ok(Identity {
            user_id: user_id.to_string(),
        })
    }
}
