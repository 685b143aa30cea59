//! OCR Types
//!
//! Engine output and the per-page outcome recorded by the pipeline.

use std::time::Duration;

use serde::{Serialize, Serializer};

/// Raw output of one engine call
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    /// Recognized text (empty for a blank page)
    pub text: String,
    /// Engine confidence, 0-1
    pub confidence: f64,
    /// Word-level results, if the engine reports them
    pub words: Vec<OcrWord>,
}

/// Single word OCR result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrWord {
    /// Word text
    pub text: String,
    /// Confidence for this word, 0-1
    pub confidence: f64,
    /// Bounding box in page pixels
    pub bounds: PixelRect,
}

/// Pixel-based rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where a recognized page's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TextSource {
    /// OCR engine
    Ocr,
    /// PDF's embedded text layer
    TextLayer,
}

/// Why a page failed. Retry policy branches on this tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureReason {
    /// The per-page deadline elapsed
    #[serde(rename_all = "camelCase")]
    Timeout {
        #[serde(serialize_with = "serialize_millis")]
        limit: Duration,
    },
    /// The engine reported an internal failure
    EngineError { message: String },
}

impl FailureReason {
    /// Timeouts are often transient (resource contention); engine errors
    /// are deterministic for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout { limit } => write!(f, "timed out after {}ms", limit.as_millis()),
            Self::EngineError { message } => write!(f, "engine error: {}", message),
        }
    }
}

/// Result for one page. Exactly one per rasterized page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PageOutcome {
    #[serde(rename_all = "camelCase")]
    Recognized {
        index: usize,
        text: String,
        confidence: f64,
        #[serde(serialize_with = "serialize_millis", rename = "elapsedMs")]
        elapsed: Duration,
        source: TextSource,
        attempts: u32,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        words: Vec<OcrWord>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        index: usize,
        reason: FailureReason,
        attempts: u32,
    },
}

impl PageOutcome {
    /// Page index this outcome belongs to
    pub fn index(&self) -> usize {
        match self {
            Self::Recognized { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    pub fn is_recognized(&self) -> bool {
        matches!(self, Self::Recognized { .. })
    }

    /// Failure reason, if this page failed
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            Self::Recognized { .. } => None,
        }
    }

    /// Number of worker calls spent on this page
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Recognized { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
        }
    }

    pub(crate) fn with_attempts(mut self, count: u32) -> Self {
        match &mut self {
            Self::Recognized { attempts, .. } | Self::Failed { attempts, .. } => *attempts = count,
        }
        self
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    EngineNotAvailable(String),

    #[error("Invalid page image: {0}")]
    InvalidImage(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),
}
