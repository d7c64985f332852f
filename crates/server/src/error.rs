//! Mapping of node errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hashrush_node::{ErrorKind, MiningError};
use serde::Serialize;
use thiserror::Error;

/// A failed request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller header is missing or malformed.
    #[error("missing or invalid x-user-id header")]
    Unauthenticated,

    /// The request body or query is malformed.
    #[error("{0}")]
    BadRequest(String),

    /// The node rejected or failed the operation.
    #[error(transparent)]
    Mining(#[from] MiningError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    reason: &'static str,
}

impl ApiError {
    /// Response status.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Mining(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Authorization => StatusCode::FORBIDDEN,
                ErrorKind::ResourceExhaustion => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::RaceLost => StatusCode::CONFLICT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::BadRequest(_) => "bad_request",
            Self::Mining(e) => e.reason(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details stay in the logs.
        let error = match &self {
            Self::Mining(MiningError::Internal(_)) => "internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error,
            reason: self.reason(),
        };
        (status, Json(body)).into_response()
    }
}
