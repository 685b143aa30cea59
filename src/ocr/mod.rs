//! OCR Module
//!
//! Page-level optical character recognition.
//!
//! - [`OcrEngine`]: the external engine seam (Tesseract CLI in production)
//! - [`OcrWorker`]: one page, one engine call, one [`PageOutcome`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::{sync::Arc, time::Duration};
//! use pagescan_server::ocr::{OcrWorker, TesseractEngine};
//!
//! let worker = OcrWorker::new(Arc::new(TesseractEngine::default()), Duration::from_secs(60));
//! let outcome = worker.recognize(&page_image, Some("eng")).await;
//! ```

mod provider;
mod types;
mod worker;

pub use provider::{OcrEngine, TesseractEngine};
pub use types::{
    EngineOutput, FailureReason, OcrError, OcrWord, PageOutcome, PixelRect, TextSource,
};
pub use worker::OcrWorker;
