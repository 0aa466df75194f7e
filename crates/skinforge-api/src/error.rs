//! Application-level error handling for HTTP handlers.
//!
//! Every failed request answers with the same envelope:
//! `{ success: false, errorType, errorCode, error, nextRequest }`, where
//! `nextRequest` is the scheduler's pacing hint when the handler had one.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use skinforge_core::error::GenerateError;
use skinforge_db::catalog::CatalogError;

use crate::engine::EngineError;

/// Classified failure for HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain failure from the generation engine.
    #[error(transparent)]
    Generate(#[from] GenerateError),

    /// A storage failure.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A local I/O failure (temp files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed request the engine never saw.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Generate(e) => AppError::Generate(e),
            EngineError::Catalog(e) => AppError::Catalog(e),
            EngineError::Io(e) => AppError::Io(e),
        }
    }
}

/// An [`AppError`] plus the optional request-pacing hint, rendered as the
/// standard error envelope.
#[derive(Debug)]
pub struct ApiFailure {
    error: AppError,
    next_request: Option<i64>,
}

impl ApiFailure {
    /// Attach the epoch second before which the caller should not retry.
    pub fn with_next_request(mut self, epoch_sec: i64) -> Self {
        self.next_request = Some(epoch_sec);
        self
    }
}

impl<E: Into<AppError>> From<E> for ApiFailure {
    fn from(e: E) -> Self {
        Self {
            error: e.into(),
            next_request: None,
        }
    }
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, ApiFailure>;

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self.error {
            AppError::Generate(e) => (status_for(e), e.error_type(), e.to_string()),
            AppError::Catalog(e) => {
                tracing::error!(error = %e, "Catalog error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!(error = %e, "I/O error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
        };

        let body = json!({
            "success": false,
            "errorType": error_type,
            "errorCode": status.as_u16(),
            "error": message,
            "nextRequest": self.next_request,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// HTTP status for each taxonomy entry.
fn status_for(e: &GenerateError) -> StatusCode {
    match e {
        GenerateError::InvalidImage(_) | GenerateError::InvalidImageUrl(_) => {
            StatusCode::BAD_REQUEST
        }
        GenerateError::NoAccountAvailable => StatusCode::SERVICE_UNAVAILABLE,
        GenerateError::FailedToCreateId(_)
        | GenerateError::SkinChangeFailed(_)
        | GenerateError::InvalidSkinData
        | GenerateError::Auth(_)
        | GenerateError::CredentialUnreadable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
