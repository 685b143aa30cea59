//! OCR pipeline
//!
//! Rasterize a document, recognize its pages in parallel with per-page
//! fault isolation, and aggregate the outcomes in page order.
//!
//! Only whole-document problems (unsupported or corrupt input, bad
//! configuration, cancellation) fail a run. A page that times out or trips
//! the engine is recorded as a failed page and its siblings carry on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pagescan_server::pipeline::{PipelineConfig, PipelineCoordinator, RunOptions};
//! use pagescan_server::raster::MupdfRasterizer;
//! use pagescan_server::ocr::TesseractEngine;
//!
//! let pipeline = PipelineCoordinator::new(
//!     Arc::new(MupdfRasterizer::default()),
//!     Arc::new(TesseractEngine::default()),
//!     PipelineConfig::default(),
//! )?;
//!
//! let result = pipeline.run(&document, &RunOptions::default()).await?;
//! println!("{} pages, failed: {:?}", result.page_count, result.failed_pages);
//! ```

mod aggregate;
mod config;
mod coordinator;
mod error;
mod result;

pub use aggregate::{aggregate, failed_page_placeholder, PAGE_BREAK};
pub use config::{default_concurrency, PipelineConfig, RunOptions, DEFAULT_DPI};
pub use coordinator::PipelineCoordinator;
pub use error::PipelineError;
pub use result::DocumentResult;
