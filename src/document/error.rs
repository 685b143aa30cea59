//! Document error types
//!
//! Whole-document failures. Any of these aborts a run before page
//! processing starts.

use thiserror::Error;

/// Document-level error type
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Bytes match neither a known image nor a PDF signature
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// PDF structure could not be parsed, or no page could be extracted
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// Rasterization did not finish in time
    #[error("Rasterization timed out after {0} seconds")]
    RasterTimeout(u64),

    /// Image decoding/encoding error
    #[error("Image error: {0}")]
    ImageError(String),

    /// Task join or other unexpected failure
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

impl From<mupdf::Error> for DocumentError {
    fn from(err: mupdf::Error) -> Self {
        DocumentError::CorruptDocument(err.to_string())
    }
}

impl From<image::ImageError> for DocumentError {
    fn from(err: image::ImageError) -> Self {
        DocumentError::ImageError(err.to_string())
    }
}
