//! Caller identification.

use crate::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use hashrush_node::UserId;

/// Header carrying the authenticated user's internal id.
///
/// Authentication happens in front of this server; requests reaching it
/// are trusted to name their caller.
pub const USER_HEADER: &str = "x-user-id";

/// The user a request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(|id| Caller(UserId(id)))
            .ok_or(ApiError::Unauthenticated)
    }
}
