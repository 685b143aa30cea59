//! Page rasterization
//!
//! Turns an [`InputDocument`] into an ordered list of [`PageImage`]s.
//! Images pass through at native resolution; PDFs are rendered page by
//! page at the requested DPI.
//!
//! The trait is the seam the pipeline depends on, so tests can swap the
//! MuPDF renderer for a fake.

mod renderer;

use async_trait::async_trait;

use crate::document::{self, InputDocument, PageImage};

pub use renderer::{MupdfRasterizer, RasterOptions};

/// Lowest accepted rendering resolution
pub const MIN_DPI: u32 = 36;
/// Highest accepted rendering resolution
pub const MAX_DPI: u32 = 1200;
/// PDF user space unit (points per inch)
pub const POINTS_PER_INCH: f32 = 72.0;

/// Converts one document into ordered page images
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Rasterize `document`. Pages are returned in document order with
    /// `index` equal to their position. Fails as a whole; never returns a
    /// partial page list.
    async fn rasterize(&self, document: &InputDocument, dpi: u32) -> document::Result<Vec<PageImage>>;
}
