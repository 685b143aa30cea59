//! Application state management

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
use crate::ocr::OcrEngine;
use crate::pipeline::{PipelineCoordinator, PipelineError};
use crate::raster::MupdfRasterizer;

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to initialize OCR pipeline: {0}")]
    PipelineInit(#[from] PipelineError),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    pipeline: PipelineCoordinator,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Create state around an already built pipeline
    pub fn new(config: Config, pipeline: PipelineCoordinator, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                shutdown,
            }),
        }
    }

    /// Build the MuPDF-backed pipeline from configuration
    ///
    /// The engine handle is created by the caller and shared by every run.
    pub fn from_config(
        config: Config,
        engine: Arc<dyn OcrEngine>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, StateError> {
        let rasterizer = MupdfRasterizer::new(config.ocr.raster_options());
        let pipeline = PipelineCoordinator::new(Arc::new(rasterizer), engine, config.ocr.pipeline_config())?;
        Ok(Self::new(config, pipeline, shutdown))
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the OCR pipeline
    pub fn pipeline(&self) -> &PipelineCoordinator {
        &self.inner.pipeline
    }

    /// Resolves once server shutdown begins. Never resolves if the
    /// shutdown sender is gone without signalling.
    pub fn shutdown_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut shutdown = self.inner.shutdown.clone();
        async move {
            let closed = shutdown.wait_for(|stopping| *stopping).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        }
    }
}
