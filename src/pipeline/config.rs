//! Pipeline configuration

use std::time::Duration;

use serde::Deserialize;

use crate::raster::{MAX_DPI, MIN_DPI};

use super::error::PipelineError;

/// Default rendering resolution for PDF pages
pub const DEFAULT_DPI: u32 = 300;
/// Default per-page OCR deadline
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 60;
/// Default number of retries for a timed-out page
pub const DEFAULT_TIMEOUT_RETRIES: u32 = 1;

/// Settings for one coordinator. Concurrency, deadlines and retry counts
/// are injected here rather than fixed in code.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// PDF rendering resolution
    pub dpi: u32,
    /// Pages recognized in parallel
    pub max_concurrency: usize,
    /// Per-page OCR deadline
    pub page_timeout: Duration,
    /// Extra attempts for a page whose OCR timed out
    pub timeout_retries: u32,
    /// Default OCR language (Tesseract code, e.g. `eng`)
    pub language: Option<String>,
    /// Use a PDF page's embedded text layer instead of OCR when present
    pub use_text_layer: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_DPI,
            max_concurrency: default_concurrency(),
            page_timeout: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            timeout_retries: DEFAULT_TIMEOUT_RETRIES,
            language: Some("eng".to_string()),
            use_text_layer: false,
        }
    }
}

impl PipelineConfig {
    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_dpi(self.dpi)?;
        if self.max_concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.page_timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "page_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-run overrides supplied by the caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunOptions {
    /// Override the configured DPI
    #[serde(default)]
    pub dpi: Option<u32>,
    /// Override the configured language
    #[serde(default)]
    pub language: Option<String>,
}

pub(crate) fn validate_dpi(dpi: u32) -> Result<(), PipelineError> {
    if !(MIN_DPI..=MAX_DPI).contains(&dpi) {
        return Err(PipelineError::InvalidConfig(format!(
            "dpi must be between {} and {}, got {}",
            MIN_DPI, MAX_DPI, dpi
        )));
    }
    Ok(())
}

/// One worker per available core
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
