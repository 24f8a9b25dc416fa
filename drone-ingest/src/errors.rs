//! Fault categories and their client-visible responses.
//!
//! Every failed request ends up as exactly one [`Fault`]. [`Fault::describe`]
//! is the single place that decides what a client gets to see for it:
//!
//! | fault                          | status | error                      |
//! |--------------------------------|--------|----------------------------|
//! | `ValidationFailed`             | 400    | `validation error`         |
//! | `BadRequestFormat`             | 400    | `invalid request format`   |
//! | `Publish(Timeout)`             | 503    | `message processing error` |
//! | `Publish(Interrupted)`         | 503    | `message processing error` |
//! | `Publish(SendFailed)`          | 503    | `message processing error` |
//! | `Internal`                     | 500    | `internal server error`    |
//!
//! Broker faults share one response so clients never see broker internals.
//! Causes are only ever logged.

use crate::publisher::PublishError;
use crate::report::Violations;
use axum::Json;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub const VALIDATION_ERROR: &str = "validation error";
pub const VALIDATION_MESSAGE_PREFIX: &str = "check parameter correctness: ";

pub const INVALID_FORMAT_ERROR: &str = "invalid request format";
pub const INVALID_FORMAT_MESSAGE: &str =
    "request contains syntax errors or does not match the expected format";

pub const PROCESSING_ERROR: &str = "message processing error";
pub const PROCESSING_MESSAGE: &str =
    "temporary problems processing data, please retry the request later";

pub const INTERNAL_ERROR: &str = "internal server error";
pub const INTERNAL_MESSAGE: &str = "an unexpected error occurred";

#[derive(Error, Debug)]
pub enum Fault {
    #[error("validation failed: {0}")]
    ValidationFailed(Violations),

    /// The body could not be read or parsed. Carries the parser's explanation.
    #[error("malformed request body: {0}")]
    BadRequestFormat(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Fault {
    /// Status code, error label and client-facing message for this fault.
    pub fn describe(&self) -> (StatusCode, &'static str, String) {
        match self {
            Fault::ValidationFailed(violations) => (
                StatusCode::BAD_REQUEST,
                VALIDATION_ERROR,
                format!("{VALIDATION_MESSAGE_PREFIX}{}", violations.joined()),
            ),
            Fault::BadRequestFormat(_) => (
                StatusCode::BAD_REQUEST,
                INVALID_FORMAT_ERROR,
                INVALID_FORMAT_MESSAGE.to_string(),
            ),
            Fault::Publish(
                PublishError::Timeout(_) | PublishError::Interrupted | PublishError::SendFailed(_),
            ) => (
                StatusCode::SERVICE_UNAVAILABLE,
                PROCESSING_ERROR,
                PROCESSING_MESSAGE.to_string(),
            ),
            Fault::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR,
                INTERNAL_MESSAGE.to_string(),
            ),
        }
    }

    fn log(&self, uuid: &Uuid) {
        match self {
            Fault::ValidationFailed(violations) => {
                tracing::info!(%uuid, %violations, "drone report failed validation");
            }
            Fault::BadRequestFormat(detail) => {
                tracing::warn!(%uuid, error = %detail, "malformed drone report request");
            }
            Fault::Publish(PublishError::Timeout(waited)) => {
                tracing::error!(%uuid, ?waited, "broker did not acknowledge drone report in time");
            }
            Fault::Publish(PublishError::Interrupted) => {
                tracing::error!(%uuid, "drone report delivery was interrupted");
            }
            Fault::Publish(PublishError::SendFailed(cause)) => {
                tracing::error!(%uuid, error = %cause, "failed to send drone report to broker");
            }
            Fault::Internal(detail) => {
                tracing::error!(%uuid, error = %detail, "internal error while handling drone report");
            }
        }
    }
}

/// Body of every error response. Each instance gets its own id and timestamp.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub uuid: Uuid,
    pub message: String,
    pub time: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: &'static str, message: String) -> Self {
        Self {
            error,
            uuid: Uuid::new_v4(),
            message,
            time: Utc::now(),
        }
    }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let (status, error, message) = self.describe();
        let body = ErrorResponse::new(error, message);
        self.log(&body.uuid);

        (status, Json(body)).into_response()
    }
}
