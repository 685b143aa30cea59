//! Document result

use serde::Serialize;

use crate::ocr::PageOutcome;

/// Final result of one run.
///
/// `pages` holds exactly one outcome per rasterized page, in page order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentResult {
    /// Page texts joined by page-break markers; failed pages replaced by a
    /// placeholder
    pub text: String,
    /// True iff no page failed
    pub success: bool,
    /// Number of pages processed
    pub page_count: usize,
    /// Indices of failed pages, ascending
    pub failed_pages: Vec<usize>,
    /// Mean confidence over recognized pages; absent when none were recognized
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_confidence: Option<f64>,
    /// Per-page outcomes
    pub pages: Vec<PageOutcome>,
}

impl DocumentResult {
    /// Number of pages with recognized text
    pub fn recognized_count(&self) -> usize {
        self.page_count - self.failed_pages.len()
    }
}
