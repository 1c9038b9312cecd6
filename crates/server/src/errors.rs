use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use service::loan::LoanError;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use crate::metrics;

/// Error payload returned by every loan endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub error: String,
    pub message: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug)]
pub struct JsonApiError {
    pub status: StatusCode,
    pub message: String,
    pub path: String,
    pub validation_errors: Option<BTreeMap<String, String>>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self { status, message: message.into(), path: path.into(), validation_errors: None }
    }

    /// 400 carrying one message per offending field.
    pub fn validation(errors: BTreeMap<String, String>, path: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".into(),
            path: path.into(),
            validation_errors: Some(errors),
        }
    }

    pub fn from_loan(err: LoanError, path: impl Into<String>) -> Self {
        let status = match &err {
            LoanError::NotFound(_) => StatusCode::NOT_FOUND,
            LoanError::DuplicateDocument(_) | LoanError::InvalidTransition { .. } => StatusCode::CONFLICT,
            LoanError::Repository(cause) => {
                // storage details stay in the log
                error!(code = err.code(), cause = %cause, "repository failure");
                return Self::new(StatusCode::INTERNAL_SERVER_ERROR, "an unexpected error occurred", path);
            }
        };
        metrics::DOMAIN_ERRORS_TOTAL.with_label_values(&[metrics::error_kind(&err)]).inc();
        Self::new(status, err.to_string(), path)
    }

    pub fn from_json_rejection(rej: JsonRejection, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("malformed request body: {}", rej.body_text()), path)
    }

    pub fn from_path_rejection(rej: PathRejection, path: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("invalid path parameter: {}", rej.body_text()), path)
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            warn!(status = self.status.as_u16(), path = %self.path, message = %self.message, "request rejected");
        }
        metrics::HTTP_ERRORS_TOTAL.with_label_values(&[self.status.as_str()]).inc();
        let body = ErrorBody {
            timestamp: Utc::now(),
            status: self.status.as_u16(),
            error: self.status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.message,
            path: self.path,
            validation_errors: self.validation_errors,
        };
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("database unavailable: {0}")]
    Database(String),
    #[error("migrations failed: {0}")]
    Migration(String),
}
