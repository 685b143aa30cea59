//! Core document types
//!
//! Input documents as received from the upload surface, and the page
//! images produced from them by rasterization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::{DocumentError, Result};

/// Declared or detected kind of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
}

impl DocumentKind {
    /// Detect kind from MIME type
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_lowercase();
        if mime == "application/pdf" {
            Some(Self::Pdf)
        } else if mime.starts_with("image/") {
            Some(Self::Image)
        } else {
            None
        }
    }

    /// Detect kind from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PDF magic: %PDF
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        let is_image = bytes.starts_with(b"\x89PNG")
            || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
            || bytes.starts_with(b"II*\0")
            || bytes.starts_with(b"MM\0*")
            || bytes.starts_with(b"GIF8")
            || bytes.starts_with(b"BM")
            || (bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP");

        if is_image {
            Some(Self::Image)
        } else {
            None
        }
    }
}

/// A document submitted for extraction. Immutable once received.
#[derive(Debug, Clone)]
pub struct InputDocument {
    id: String,
    kind: DocumentKind,
    bytes: Arc<[u8]>,
}

impl InputDocument {
    /// Build a document from raw bytes.
    ///
    /// The byte signature decides the kind. A MIME hint that disagrees with
    /// the signature is logged and ignored; bytes with no known signature
    /// are rejected regardless of the hint.
    pub fn from_bytes(
        id: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        mime_hint: Option<&str>,
    ) -> Result<Self> {
        let id = id.into();
        let bytes: Arc<[u8]> = bytes.into();

        let detected = DocumentKind::from_magic_bytes(&bytes).ok_or_else(|| {
            DocumentError::UnsupportedFormat(match mime_hint {
                Some(mime) => format!("content does not match a known image or PDF signature (declared {})", mime),
                None => "content does not match a known image or PDF signature".to_string(),
            })
        })?;

        if let Some(declared) = mime_hint.and_then(DocumentKind::from_mime) {
            if declared != detected {
                tracing::warn!(
                    document_id = %id,
                    ?declared,
                    ?detected,
                    "Declared format disagrees with content, using detected format"
                );
            }
        }

        Ok(Self {
            id,
            kind: detected,
            bytes,
        })
    }

    /// Short content fingerprint, usable as an id when the caller has none
    pub fn fingerprint(bytes: &[u8]) -> String {
        let digest = Sha256::digest(bytes);
        hex::encode(&digest[..8])
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One rasterized page, owned by the run that produced it
#[derive(Clone)]
pub struct PageImage {
    /// 0-based page index, stable across the run
    pub index: usize,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Rendering resolution; `None` for images kept at native resolution
    pub dpi: Option<u32>,
    /// Encoded image (PNG for rendered PDF pages, original bytes for images)
    pub data: Vec<u8>,
    /// Embedded text layer, captured only when the text-layer fast path is on
    pub embedded_text: Option<String>,
    /// Set when this single page could not be rendered; `data` is empty then
    pub render_error: Option<String>,
}

impl PageImage {
    /// Placeholder for a page whose rendering failed. It keeps its slot in
    /// the page order and turns into a failed outcome downstream.
    pub fn unrendered(index: usize, dpi: Option<u32>, reason: impl Into<String>) -> Self {
        Self {
            index,
            width: 0,
            height: 0,
            dpi,
            data: Vec::new(),
            embedded_text: None,
            render_error: Some(reason.into()),
        }
    }
}

impl std::fmt::Debug for PageImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageImage")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dpi", &self.dpi)
            .field("bytes", &self.data.len())
            .field("embedded_text", &self.embedded_text.as_ref().map(|t| t.len()))
            .field("render_error", &self.render_error)
            .finish()
    }
}
