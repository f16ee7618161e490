//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Every [`EngineError`] kind maps to its own HTTP status and keeps the
//! engine's machine-readable code, so a client can tell "resubmit with a
//! fresh proof" from "ask an administrator to fix thresholds".
//!
//! Internal and sealed-backend failures are logged and never returned in
//! detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cspin_engine::EngineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "INVALID_PROOF", "NO_OUTCOME_YET").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient role (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persisted state is newer than the request's (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),

    /// A domain failure from the spin engine.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::Engine(e) => {
                let status = match e {
                    EngineError::InvalidProof(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    EngineError::ConfigurationInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    EngineError::Unauthorized { .. } => StatusCode::FORBIDDEN,
                    EngineError::NoOutcomeYet(_) => StatusCode::NOT_FOUND,
                    EngineError::ClassificationInFlight(_) => StatusCode::CONFLICT,
                    EngineError::ConfigurationStale { .. } => StatusCode::CONFLICT,
                    EngineError::Sealed(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.code())
            }
        }
    }

    fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_) | Self::Engine(EngineError::Sealed(_))
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, "internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Malformed principals, handles and hex in requests.
impl From<cspin_core::ValidationError> for AppError {
    fn from(err: cspin_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}
