//! # Error Handling
//!
//! Problem+json error responses for the inbound HTTP surface (the event
//! webhook and the health probe). Domain errors carry their own types; this
//! module only maps them onto transport responses.

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::events::EventError;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Correlation id for log lookup
    pub trace_id: Box<str>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            trace_id: format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );
        (self.status, headers, axum::Json(self)).into_response()
    }
}

impl From<EventError> for ApiError {
    fn from(error: EventError) -> Self {
        match &error {
            EventError::Malformed { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                "MALFORMED_EVENT",
                &error.to_string(),
            ),
            EventError::UnknownTarget { .. } => Self::new(
                StatusCode::NOT_FOUND,
                "UNKNOWN_TARGET",
                &error.to_string(),
            ),
            EventError::Forwarding { .. } => {
                tracing::error!(error = %error, "Event forwarding failed");
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    "FORWARDING_ERROR",
                    "Failed to apply the event to the catalog",
                )
            }
        }
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        tracing::error!(error = ?error, "Database error");
        match error {
            sea_orm::DbErr::Conn(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Database service unavailable",
            ),
            _ => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "Database error occurred",
            ),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!(error = ?error, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}
