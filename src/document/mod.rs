//! Document model
//!
//! Input documents (scanned images or PDFs) and the page images a run
//! produces from them.
//!
//! ```text
//!   InputDocument ──rasterize──▶ [PageImage 0, PageImage 1, ...]
//!   (bytes + kind)               (index, pixels, resolution)
//! ```

mod error;
mod types;

pub use error::{DocumentError, Result};
pub use types::{DocumentKind, InputDocument, PageImage};
