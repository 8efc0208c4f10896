//! Transport-level error mapping.
//!
//! Domain errors cross into HTTP exactly here; every variant renders as a
//! `{"message": "..."}` body with a matching status. Store and provider
//! failures are logged with their detail and answered with a generic
//! message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::provider::ProviderError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized(reason) => (StatusCode::UNAUTHORIZED, reason.clone()),
            ApiError::NotFound(reason) => (StatusCode::NOT_FOUND, reason.clone()),
            ApiError::Validation(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason.clone()),
            ApiError::Store(e) => {
                tracing::error!("store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            ApiError::Provider(ProviderError::Unknown(name)) => {
                (StatusCode::NOT_FOUND, format!("unknown provider: {name}"))
            }
            ApiError::Provider(e) => {
                tracing::error!("identity provider error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "sign-in with the identity provider failed".to_string(),
                )
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
