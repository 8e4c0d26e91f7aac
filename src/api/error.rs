//! Error bridge between the rental engine and HTTP responses.

use crate::error::RentalError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps engine errors and converts them into `{code, message}` JSON
/// responses via Axum's `IntoResponse`.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: String,
    /// Machine-readable detail, e.g. the offending item and quantities on
    /// stock errors, so callers can adjust and retry.
    details: Option<serde_json::Value>,
    /// Internal error for logging, not exposed to the client.
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            details: None,
            source: None,
        }
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Attach machine-readable details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Optional machine-readable detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RentalError> for AppError {
    fn from(err: RentalError) -> Self {
        match err {
            RentalError::InvalidRequest(message) => Self::new(
                StatusCode::BAD_REQUEST,
                message,
                "INVALID_REQUEST".to_string(),
            ),
            RentalError::ItemNotFound(item_id) => Self::new(
                StatusCode::NOT_FOUND,
                format!("rental item with id {item_id} not found"),
                "ITEM_NOT_FOUND".to_string(),
            )
            .with_details(json!({ "item_id": item_id })),
            RentalError::ItemUnavailable(item_id) => Self::new(
                StatusCode::CONFLICT,
                format!("rental item {item_id} is not available for reservation"),
                "ITEM_UNAVAILABLE".to_string(),
            )
            .with_details(json!({ "item_id": item_id })),
            RentalError::InsufficientStock {
                item_id,
                requested,
                available,
            } => Self::new(
                StatusCode::CONFLICT,
                format!(
                    "insufficient stock for item {item_id}: requested {requested}, available {available}"
                ),
                "INSUFFICIENT_STOCK".to_string(),
            )
            .with_details(json!({
                "item_id": item_id,
                "requested": requested,
                "available": available,
            })),
            RentalError::OrderNotFound(order_id) => Self::new(
                StatusCode::NOT_FOUND,
                format!("order with id {order_id} not found"),
                "ORDER_NOT_FOUND".to_string(),
            ),
            RentalError::InvalidTransition { from, to } => Self::new(
                StatusCode::CONFLICT,
                format!("invalid status transition from {from} to {to}"),
                "INVALID_TRANSITION".to_string(),
            ),
            RentalError::Storage(detail) => Self::internal("a storage error occurred")
                .with_source(anyhow::anyhow!(detail)),
        }
    }
}
