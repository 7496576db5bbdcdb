use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Request-level failure taxonomy. Every handler funnels its errors
/// through here so status codes and body shapes stay consistent.
///
/// Validation-style failures carry an `errors` array; authorization
/// failures and missing resources carry a single `message`. Internal
/// failures are logged with full detail and answered with a generic body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    Conflict(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(String),
    #[error("token has expired")]
    TokenExpired,
    #[error("invalid token")]
    TokenInvalid,
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            ApiError::Conflict(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": [msg] }))).into_response()
            }
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "errors": ["Invalid email or password"] })),
            )
                .into_response(),
            ApiError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "message": msg }))).into_response()
            }
            ApiError::TokenExpired => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "Token has expired" })),
            )
                .into_response(),
            ApiError::TokenInvalid => (
                StatusCode::FORBIDDEN,
                Json(json!({ "message": "Invalid token" })),
            )
                .into_response(),
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": msg }))).into_response()
            }
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "errors": ["Internal server error"] })),
                )
                    .into_response()
            }
        }
    }
}
