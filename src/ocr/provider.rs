//! OCR Engines
//!
//! Defines the engine trait and the Tesseract implementation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::types::{EngineOutput, OcrError, OcrWord, PixelRect};

/// OCR engine trait
///
/// Engines are plain handles passed to the pipeline, never process-wide
/// singletons, so concurrent runs share nothing implicitly and tests can
/// inject fakes.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short engine name for logs and the engines endpoint
    fn name(&self) -> &'static str;

    /// Check if the engine can be used
    async fn is_available(&self) -> bool;

    /// Perform OCR on an encoded page image
    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<EngineOutput, OcrError>;
}

/// Tesseract OCR engine (CLI)
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    /// Path or name of the tesseract binary
    binary: String,
    /// Default language
    default_language: String,
}

impl TesseractEngine {
    pub fn new(binary: &str, default_language: &str) -> Self {
        Self {
            binary: binary.to_string(),
            default_language: default_language.to_string(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_data: &[u8], language: Option<&str>) -> Result<EngineOutput, OcrError> {
        if image_data.is_empty() {
            return Err(OcrError::InvalidImage("empty image buffer".to_string()));
        }

        let lang = language.unwrap_or(&self.default_language);

        // Image on stdin, TSV on stdout. The child is killed if this future
        // is dropped (page timeout or run cancellation).
        let mut child = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::EngineNotAvailable(format!("Failed to run {}: {}", self.binary, e)))?;

        // A tesseract that exits early breaks the pipe; its stderr still
        // explains why, so collect the exit status before reporting.
        // Dropping stdin at the end of the arm signals end of input.
        let write_error = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(image_data).await.err(),
            None => None,
        };

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to wait for tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        if let Some(e) = write_error {
            return Err(OcrError::ProcessingError(format!("Failed to write image: {}", e)));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Word row position in the block/paragraph/line hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineKey {
    block: u32,
    paragraph: u32,
    line: u32,
}

/// Parse Tesseract TSV output.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Only word rows (level 5) with text are
/// used. Words on the same line are joined by spaces, lines by newlines,
/// and blocks are separated by a blank line. Page confidence is the mean
/// word confidence, 0 when no words were found.
pub(crate) fn parse_tsv(tsv: &str) -> EngineOutput {
    let mut text = String::new();
    let mut words = Vec::new();
    let mut previous: Option<LineKey> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.splitn(12, '\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }

        let word = cols[11].trim();
        let conf: f64 = cols[10].trim().parse().unwrap_or(-1.0);
        if word.is_empty() || !conf.is_finite() || conf < 0.0 {
            continue;
        }

        let num = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let key = LineKey {
            block: num(2),
            paragraph: num(3),
            line: num(4),
        };

        match previous {
            None => {}
            Some(prev) if prev.block != key.block => text.push_str("\n\n"),
            Some(prev) if prev != key => text.push('\n'),
            Some(_) => text.push(' '),
        }
        text.push_str(word);
        previous = Some(key);

        words.push(OcrWord {
            text: word.to_string(),
            confidence: (conf / 100.0).clamp(0.0, 1.0),
            bounds: PixelRect {
                x: num(6),
                y: num(7),
                width: num(8),
                height: num(9),
            },
        });
    }

    let confidence = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.confidence).sum::<f64>() / words.len() as f64
    };

    EngineOutput {
        text,
        confidence,
        words,
    }
}

/// Mock engine for testing
#[cfg(test)]
pub struct MockEngine {
    pub response: Result<EngineOutput, String>,
    pub available: bool,
}

#[cfg(test)]
#[async_trait]
impl OcrEngine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> Result<EngineOutput, OcrError> {
        self.response.clone().map_err(OcrError::ProcessingError)
    }
}
