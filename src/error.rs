//! Application-wide error types using thiserror
//!
//! Facade operations and HTTP handlers return `AppError`; its
//! `IntoResponse` impl turns every failure into a JSON `{ "error": ... }`
//! body with a matching status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::adapters::errors::ExchangeError;
use crate::core::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Exchange(#[from] ExchangeError),

    /// Close order could not be placed; carries the adapter's failure
    #[error("Failed to close position: {0}")]
    CloseFailed(#[source] ExchangeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Exchange(ExchangeError::Validation(_) | ExchangeError::UnsupportedExchange(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) | AppError::Store(StoreError::Unauthorized) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Store(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Exchange(_)
            | AppError::CloseFailed(_)
            | AppError::Serialization(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(ExchangeError::Validation("size".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::from(StoreError::Unauthorized).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(ExchangeError::Transport("reset".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(StoreError::DatabaseError("down".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_close_failure_message() {
        let err = AppError::CloseFailed(ExchangeError::Transport("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            err.to_string(),
            "Failed to close position: Transport error: connection refused"
        );
    }

    #[test]
    fn test_exchange_message_passes_through() {
        let err = AppError::from(ExchangeError::api(10001, "invalid signature"));
        assert_eq!(err.to_string(), "Exchange API error (10001): invalid signature");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = AppError::NotFound("No active API key found for okx".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "No active API key found for okx");
    }
}
