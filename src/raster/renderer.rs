//! MuPDF page rasterizer
//!
//! Renders PDF pages to PNG through MuPDF on the blocking thread pool.
//! Image documents skip MuPDF entirely: they are only probed for their
//! dimensions and handed on as-is.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use image::{DynamicImage, ImageReader};
use mupdf::{Colorspace, Matrix};
use tokio::time::timeout;

use crate::document::{self, DocumentError, DocumentKind, InputDocument, PageImage};

use super::{PageRasterizer, POINTS_PER_INCH};

/// Default timeout for rasterizing a whole document
const DEFAULT_RASTER_TIMEOUT_SECS: u64 = 120;

/// Rasterizer options
#[derive(Debug, Clone)]
pub struct RasterOptions {
    /// Upper bound for one document's rasterization. MuPDF cannot be
    /// interrupted, so the blocking thread may outlive this deadline; the
    /// run does not.
    pub timeout: Duration,
    /// Capture each PDF page's embedded text layer
    pub capture_text_layer: bool,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RASTER_TIMEOUT_SECS),
            capture_text_layer: false,
        }
    }
}

/// MuPDF-backed [`PageRasterizer`]
#[derive(Debug, Clone, Default)]
pub struct MupdfRasterizer {
    options: RasterOptions,
}

impl MupdfRasterizer {
    pub fn new(options: RasterOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageRasterizer for MupdfRasterizer {
    async fn rasterize(&self, document: &InputDocument, dpi: u32) -> document::Result<Vec<PageImage>> {
        let kind = document.kind();
        let data = document.bytes().to_vec();
        let capture_text = self.options.capture_text_layer;
        let limit = self.options.timeout;

        // Offload CPU-bound decoding/rendering to the blocking pool
        let render_result = timeout(
            limit,
            tokio::task::spawn_blocking(move || match kind {
                DocumentKind::Image => passthrough_image(data).map(|page| vec![page]),
                DocumentKind::Pdf => render_pdf(&data, dpi, capture_text),
            }),
        )
        .await;

        let pages = match render_result {
            Ok(join_result) => join_result
                .map_err(|e| DocumentError::Internal(format!("Task join error: {}", e)))??,
            Err(_) => return Err(DocumentError::RasterTimeout(limit.as_secs())),
        };

        tracing::debug!(
            document_id = %document.id(),
            ?kind,
            dpi,
            pages = pages.len(),
            "Rasterized document"
        );

        Ok(pages)
    }
}

/// Keep an image document at native resolution as page 0
fn passthrough_image(data: Vec<u8>) -> document::Result<PageImage> {
    let (width, height) = ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .map_err(|e| DocumentError::CorruptDocument(format!("Unreadable image: {}", e)))?
        .into_dimensions()
        .map_err(|e| DocumentError::CorruptDocument(format!("Unreadable image: {}", e)))?;

    Ok(PageImage {
        index: 0,
        width,
        height,
        dpi: None,
        data,
        embedded_text: None,
        render_error: None,
    })
}

/// Render every page of a PDF.
///
/// The document itself must open and report at least one page, otherwise
/// the whole document is corrupt. A single page that fails to render keeps
/// its slot as an unrendered placeholder.
fn render_pdf(data: &[u8], dpi: u32, capture_text: bool) -> document::Result<Vec<PageImage>> {
    let doc = mupdf::Document::from_bytes(data, "application/pdf")?;
    let page_count = doc.page_count()?;
    if page_count <= 0 {
        return Err(DocumentError::CorruptDocument(
            "no pages could be extracted".to_string(),
        ));
    }

    let scale = dpi as f32 / POINTS_PER_INCH;
    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();

    let mut pages = Vec::with_capacity(page_count as usize);
    for index in 0..page_count as usize {
        let rendered = render_page(&doc, index, dpi, &matrix, &colorspace, capture_text);
        match rendered {
            Ok(page) => pages.push(page),
            Err(e) => {
                tracing::warn!(page = index, "Failed to render page: {}", e);
                pages.push(PageImage::unrendered(index, Some(dpi), e.to_string()));
            }
        }
    }

    Ok(pages)
}

fn render_page(
    doc: &mupdf::Document,
    index: usize,
    dpi: u32,
    matrix: &Matrix,
    colorspace: &Colorspace,
    capture_text: bool,
) -> document::Result<PageImage> {
    let page = doc.load_page(index as i32)?;
    let pixmap = page.to_pixmap(matrix, colorspace, false, true)?;
    let (png, width, height) = encode_pixmap(&pixmap)?;

    let embedded_text = if capture_text {
        let text_page = page.to_text_page(mupdf::TextPageOptions::empty())?;
        Some(text_page.to_text()?)
    } else {
        None
    };

    Ok(PageImage {
        index,
        width,
        height,
        dpi: Some(dpi),
        data: png,
        embedded_text,
        render_error: None,
    })
}

/// Encode a MuPDF pixmap as PNG
fn encode_pixmap(pixmap: &mupdf::Pixmap) -> document::Result<(Vec<u8>, u32, u32)> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    let mut rgb_buffer = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(255);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    let img = image::RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| DocumentError::ImageError("Failed to create image buffer".to_string()))?;

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut output), image::ImageFormat::Png)?;

    Ok((output, width, height))
}
