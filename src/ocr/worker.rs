//! OCR Worker
//!
//! Runs one engine call for one page under a deadline and turns the result
//! into a [`PageOutcome`]. No retries happen here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::document::PageImage;

use super::provider::OcrEngine;
use super::types::{FailureReason, PageOutcome, TextSource};

/// Single-page OCR adapter
#[derive(Clone)]
pub struct OcrWorker {
    engine: Arc<dyn OcrEngine>,
    page_timeout: Duration,
    use_text_layer: bool,
}

impl OcrWorker {
    pub fn new(engine: Arc<dyn OcrEngine>, page_timeout: Duration) -> Self {
        Self {
            engine,
            page_timeout,
            use_text_layer: false,
        }
    }

    /// Prefer a page's embedded text layer over OCR when it has one
    pub fn with_text_layer(mut self, enabled: bool) -> Self {
        self.use_text_layer = enabled;
        self
    }

    /// Recognize one page. Always yields an outcome, never an error.
    pub async fn recognize(&self, page: &PageImage, language_hint: Option<&str>) -> PageOutcome {
        let index = page.index;

        if let Some(reason) = &page.render_error {
            return PageOutcome::Failed {
                index,
                reason: FailureReason::EngineError {
                    message: format!("page could not be rendered: {}", reason),
                },
                attempts: 1,
            };
        }

        if self.use_text_layer {
            if let Some(text) = page.embedded_text.as_deref().filter(|t| !t.trim().is_empty()) {
                return PageOutcome::Recognized {
                    index,
                    text: text.trim().to_string(),
                    confidence: 1.0,
                    elapsed: Duration::ZERO,
                    source: TextSource::TextLayer,
                    attempts: 1,
                    words: Vec::new(),
                };
            }
        }

        let started = Instant::now();
        let result = timeout(self.page_timeout, self.engine.recognize(&page.data, language_hint)).await;
        let elapsed = started.elapsed();

        match result {
            Ok(Ok(output)) => {
                tracing::debug!(
                    page = index,
                    engine = self.engine.name(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    confidence = output.confidence,
                    "Page recognized"
                );
                PageOutcome::Recognized {
                    index,
                    text: output.text,
                    confidence: normalize_confidence(output.confidence),
                    elapsed,
                    source: TextSource::Ocr,
                    attempts: 1,
                    words: output.words,
                }
            }
            Ok(Err(e)) => PageOutcome::Failed {
                index,
                reason: FailureReason::EngineError {
                    message: e.to_string(),
                },
                attempts: 1,
            },
            Err(_) => PageOutcome::Failed {
                index,
                reason: FailureReason::Timeout {
                    limit: self.page_timeout,
                },
                attempts: 1,
            },
        }
    }
}

/// Engine confidence clamped to 0-1; NaN and infinities count as 0
fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
