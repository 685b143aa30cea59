//! Pipeline coordinator
//!
//! Drives one document through rasterization, page-parallel OCR and
//! aggregation.
//!
//! ```text
//! InputDocument ─▶ PageRasterizer ─▶ [PageImage; n]
//!                                        │ JoinSet, bounded by Semaphore
//!                        ┌───────────────┼───────────────┐
//!                        ▼               ▼               ▼
//!                    OcrWorker       OcrWorker       OcrWorker
//!                        │               │               │  (any completion order)
//!                        └──────▶ slots[index] ◀─────────┘
//!                                        │
//!                                   aggregate() ─▶ DocumentResult
//! ```

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::document::{InputDocument, PageImage};
use crate::ocr::{FailureReason, OcrEngine, OcrWorker, PageOutcome};
use crate::raster::PageRasterizer;

use super::aggregate::aggregate;
use super::config::{validate_dpi, PipelineConfig, RunOptions};
use super::error::PipelineError;
use super::result::DocumentResult;

/// Page-level OCR pipeline
///
/// Holds explicit handles to the rasterizer and OCR engine; no global state.
/// A coordinator is cheap to share and may serve concurrent runs.
#[derive(Clone)]
pub struct PipelineCoordinator {
    rasterizer: Arc<dyn PageRasterizer>,
    engine: Arc<dyn OcrEngine>,
    config: PipelineConfig,
}

impl PipelineCoordinator {
    /// Create a coordinator. Fails if the configuration is unusable.
    pub fn new(
        rasterizer: Arc<dyn PageRasterizer>,
        engine: Arc<dyn OcrEngine>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            rasterizer,
            engine,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn OcrEngine> {
        &self.engine
    }

    /// Run the pipeline to completion
    pub async fn run(
        &self,
        document: &InputDocument,
        options: &RunOptions,
    ) -> Result<DocumentResult, PipelineError> {
        self.run_until(document, options, std::future::pending()).await
    }

    /// Run the pipeline until it completes or `cancel` resolves.
    ///
    /// On cancellation every in-flight page task is aborted and
    /// [`PipelineError::RunCancelled`] is returned; partial outcomes are
    /// discarded. Dropping the returned future has the same effect.
    #[tracing::instrument(
        name = "pipeline_run",
        skip_all,
        fields(document_id = %document.id(), kind = ?document.kind(), run_id = %uuid::Uuid::new_v4())
    )]
    pub async fn run_until<C>(
        &self,
        document: &InputDocument,
        options: &RunOptions,
        cancel: C,
    ) -> Result<DocumentResult, PipelineError>
    where
        C: Future<Output = ()> + Send,
    {
        let dpi = options.dpi.unwrap_or(self.config.dpi);
        validate_dpi(dpi)?;
        let language = options
            .language
            .clone()
            .or_else(|| self.config.language.clone());

        let started = Instant::now();
        tokio::pin!(cancel);

        let pages = tokio::select! {
            biased;
            _ = &mut cancel => {
                tracing::info!("Run cancelled during rasterization");
                return Err(PipelineError::RunCancelled);
            }
            pages = self.rasterizer.rasterize(document, dpi) => pages.map_err(|e| {
                tracing::error!("Rasterization failed: {}", e);
                PipelineError::from(e)
            })?,
        };

        let page_count = pages.len();
        tracing::info!(pages = page_count, dpi, "Document rasterized, starting OCR");

        let worker = Arc::new(
            OcrWorker::new(Arc::clone(&self.engine), self.config.page_timeout)
                .with_text_layer(self.config.use_text_layer),
        );
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let language: Option<Arc<str>> = language.map(Arc::from);
        let timeout_retries = self.config.timeout_retries;

        // Dropping the JoinSet aborts every task still in it
        let mut tasks = JoinSet::new();
        for page in pages {
            let worker = Arc::clone(&worker);
            let semaphore = Arc::clone(&semaphore);
            let language = language.clone();
            let index = page.index;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let work = recognize_with_retry(&worker, page, language.as_deref(), timeout_retries);

                let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(_) => PageOutcome::Failed {
                        index,
                        reason: FailureReason::EngineError {
                            message: "page worker panicked".to_string(),
                        },
                        attempts: 1,
                    },
                };
                (index, outcome)
            });
        }

        // Indexed collection: completion order never affects recorded order
        let mut slots: Vec<Option<PageOutcome>> = vec![None; page_count];
        loop {
            tokio::select! {
                biased;
                _ = &mut cancel => {
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    tracing::info!(
                        completed = slots.iter().filter(|s| s.is_some()).count(),
                        pages = page_count,
                        "Run cancelled, discarding partial outcomes"
                    );
                    return Err(PipelineError::RunCancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, outcome))) => {
                        if let Some(reason) = outcome.failure() {
                            tracing::warn!(page = index, attempts = outcome.attempts(), "Page failed: {}", reason);
                        }
                        match slots.get_mut(index) {
                            Some(slot) => *slot = Some(outcome),
                            None => {
                                return Err(PipelineError::Internal(format!(
                                    "page index {} out of range for {} pages",
                                    index, page_count
                                )))
                            }
                        }
                    }
                    Some(Err(e)) => {
                        return Err(PipelineError::Internal(format!("Task join error: {}", e)));
                    }
                },
            }
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| PipelineError::Internal(format!("no outcome recorded for page {}", index)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = aggregate(outcomes);

        tracing::info!(
            pages = result.page_count,
            failed = result.failed_pages.len(),
            average_confidence = ?result.average_confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run complete"
        );

        Ok(result)
    }
}

/// Recognize one page, retrying only timeouts, up to `timeout_retries`
/// extra attempts. The page buffer is released when this returns.
async fn recognize_with_retry(
    worker: &OcrWorker,
    page: PageImage,
    language: Option<&str>,
    timeout_retries: u32,
) -> PageOutcome {
    let mut attempts = 0;
    loop {
        attempts += 1;
        let outcome = worker.recognize(&page, language).await;

        match outcome.failure() {
            Some(reason) if reason.is_retryable() && attempts <= timeout_retries => {
                tracing::warn!(page = page.index, attempt = attempts, "Page OCR timed out, retrying");
            }
            _ => return outcome.with_attempts(attempts),
        }
    }
}
