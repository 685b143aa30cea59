//! Pipeline error types
//!
//! Only whole-run failures live here. Page-level failures are data
//! ([`crate::ocr::PageOutcome::Failed`]) and never surface as errors.

use thiserror::Error;

use crate::document::DocumentError;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rasterization or input validation failed; propagated unchanged
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Caller or infrastructure aborted the run
    #[error("Run cancelled")]
    RunCancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}
