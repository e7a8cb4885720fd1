//! Caller identity. Authentication happens upstream (gateway/session layer),
//! which forwards the verified user id in the `x-user-id` header.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated user making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(AppError::Unauthorized)?;

        header
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(AuthUser)
            .ok_or_else(|| {
                warn!("Rejected request with malformed {USER_ID_HEADER} header");
                AppError::Unauthorized
            })
    }
}
