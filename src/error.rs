//! Error types for the PageScan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::document::DocumentError;
use crate::pipeline::PipelineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        AppError::Pipeline(PipelineError::Document(err))
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Pipeline(e) => match e {
                PipelineError::Document(doc) => match doc {
                    DocumentError::UnsupportedFormat(msg) => (
                        StatusCode::UNSUPPORTED_MEDIA_TYPE,
                        "unsupported_format",
                        msg.clone(),
                    ),
                    DocumentError::CorruptDocument(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "corrupt_document",
                        msg.clone(),
                    ),
                    DocumentError::ImageError(msg) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        "image_error",
                        msg.clone(),
                    ),
                    DocumentError::RasterTimeout(_) => (
                        StatusCode::GATEWAY_TIMEOUT,
                        "raster_timeout",
                        doc.to_string(),
                    ),
                    DocumentError::Internal(msg) => {
                        tracing::error!("Document processing error: {}", msg);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "internal_error",
                            "An internal error occurred".to_string(),
                        )
                    }
                },
                PipelineError::InvalidConfig(msg) => {
                    (StatusCode::BAD_REQUEST, "invalid_config", msg.clone())
                }
                PipelineError::RunCancelled => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "run_cancelled",
                    "Extraction was cancelled".to_string(),
                ),
                PipelineError::Internal(msg) => {
                    tracing::error!("Pipeline error: {}", msg);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "internal_error",
                        "An internal error occurred".to_string(),
                    )
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
