//! HTTP API surface for the rental engine.
//!
//! Auth and session handling live in the upstream gateway; handlers here
//! read the authenticated user id from the `x-user-id` header and enforce
//! ownership themselves.

pub mod error;
pub mod items;
pub mod orders;

pub use error::AppError;

use crate::types::UserId;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated requester id, installed by the gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated requester identity, extracted from [`USER_ID_HEADER`].
#[derive(Clone, Copy, Debug)]
pub struct RequesterId(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for RequesterId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing user identity"))?;
        let uuid: Uuid = value
            .parse()
            .map_err(|_| AppError::unauthorized("malformed user identity"))?;
        Ok(Self(UserId::from_uuid(uuid)))
    }
}
