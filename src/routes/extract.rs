//! Document text extraction API
//!
//! Accepts a multipart upload (an image or a PDF), runs it through the OCR
//! pipeline, and returns the aggregated text either as a JSON envelope with
//! per-page detail or as plain text.

use std::path::Path;

use axum::{
    extract::{rejection::QueryRejection, Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::document::{DocumentKind, InputDocument};
use crate::error::{AppError, Result};
use crate::pipeline::{DocumentResult, RunOptions};
use crate::state::AppState;

/// Multipart field names accepted for the uploaded document
const UPLOAD_FIELDS: [&str; 2] = ["file", "document"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractQuery {
    pub dpi: Option<u32>,
    pub language: Option<String>,
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub document_id: String,
    pub kind: DocumentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub processed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub result: DocumentResult,
}

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl Upload {
    /// MIME hint from the part header, falling back to the file extension
    fn mime_hint(&self) -> Option<String> {
        self.content_type
            .clone()
            .filter(|ct| ct != "application/octet-stream")
            .or_else(|| {
                self.file_name
                    .as_deref()
                    .and_then(|name| mime_guess::from_path(name).first_raw())
                    .map(str::to_string)
            })
    }

    fn document_id(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| InputDocument::fingerprint(&self.data))
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        if !UPLOAD_FIELDS.contains(&name.as_str()) {
            tracing::debug!("Skipping multipart field '{}'", name);
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        let content_type = field.content_type().map(|s| s.to_string());
        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        tracing::debug!(
            "Received '{}': file_name={:?}, content_type={:?}, {} bytes",
            name,
            file_name,
            content_type,
            data.len()
        );

        return Ok(Upload {
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }

    tracing::warn!("No document field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file' or 'document'".to_string(),
    ))
}

/// Extract text from an uploaded document
async fn extract(
    State(state): State<AppState>,
    query: std::result::Result<Query<ExtractQuery>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Response> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;
    if upload.data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
    }

    let mime_hint = upload.mime_hint();
    let document_id = upload.document_id();
    let Upload { file_name, data, .. } = upload;
    let document = InputDocument::from_bytes(document_id, data, mime_hint.as_deref())?;

    let options = RunOptions {
        dpi: query.dpi,
        language: query.language,
    };

    let result = state
        .pipeline()
        .run_until(&document, &options, state.shutdown_signal())
        .await?;

    tracing::info!(
        document_id = %document.id(),
        pages = result.page_count,
        failed = result.failed_pages.len(),
        "Extraction complete"
    );

    let response = match query.format {
        OutputFormat::Text => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            result.text,
        )
            .into_response(),
        OutputFormat::Json => Json(ExtractResponse {
            document_id: document.id().to_string(),
            kind: document.kind(),
            file_name,
            processed_at: Utc::now(),
            result,
        })
        .into_response(),
    };

    Ok(response)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(extract))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use image::{ImageFormat, RgbImage};
    use serde_json::Value;
    use tokio::sync::watch;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::ocr::{EngineOutput, OcrEngine, OcrError};
    use crate::pipeline::{PipelineConfig, PipelineCoordinator, PAGE_BREAK};
    use crate::raster::MupdfRasterizer;

    const BOUNDARY: &str = "pagescan-test-boundary";

    struct FixedEngine;

    #[async_trait]
    impl OcrEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn is_available(&self) -> bool {
            true
        }

        async fn recognize(&self, _image_data: &[u8], _language: Option<&str>) -> std::result::Result<EngineOutput, OcrError> {
            Ok(EngineOutput {
                text: "hello page".to_string(),
                confidence: 0.9,
                words: Vec::new(),
            })
        }
    }

    fn test_state() -> (AppState, watch::Sender<bool>) {
        let pipeline = PipelineCoordinator::new(
            Arc::new(MupdfRasterizer::default()),
            Arc::new(FixedEngine),
            PipelineConfig::default(),
        )
        .unwrap();
        let (tx, rx) = watch::channel(false);
        (AppState::new(Config::default(), pipeline, rx), tx)
    }

    fn png_bytes() -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbImage::new(8, 8).write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn upload_request(uri: &str, field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                field, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_extract_image_returns_json_envelope() {
        let (state, _tx) = test_state();
        let request = upload_request("/api/v1/extract", "file", "receipt.png", "image/png", &png_bytes());

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["documentId"], "receipt");
        assert_eq!(json["kind"], "image");
        assert_eq!(json["fileName"], "receipt.png");
        assert_eq!(json["text"], "hello page");
        assert_eq!(json["success"], true);
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["failedPages"].as_array().unwrap().len(), 0);
        assert_eq!(json["pages"][0]["status"], "recognized");
    }

    #[tokio::test]
    async fn test_extract_text_format() {
        let (state, _tx) = test_state();
        let request = upload_request(
            "/api/v1/extract?format=text&language=deu",
            "document",
            "scan.png",
            "application/octet-stream",
            &png_bytes(),
        );

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text, "hello page");
        assert!(!text.contains(PAGE_BREAK));
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_415() {
        let (state, _tx) = test_state();
        let request = upload_request("/api/v1/extract", "file", "notes.txt", "text/plain", b"just some text");

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body_json(response).await["error"], "unsupported_format");
    }

    #[tokio::test]
    async fn test_corrupt_image_is_422() {
        let (state, _tx) = test_state();
        let mut truncated = png_bytes();
        truncated.truncate(24);
        let request = upload_request("/api/v1/extract", "file", "broken.png", "image/png", &truncated);

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["error"], "corrupt_document");
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400() {
        let (state, _tx) = test_state();
        let request = upload_request("/api/v1/extract", "attachment", "a.png", "image/png", &png_bytes());

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "bad_request");
    }

    #[tokio::test]
    async fn test_out_of_range_dpi_is_400() {
        let (state, _tx) = test_state();
        let request = upload_request("/api/v1/extract?dpi=5", "file", "a.png", "image/png", &png_bytes());

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_config");
    }

    #[tokio::test]
    async fn test_malformed_query_is_json_400() {
        for uri in ["/api/v1/extract?dpi=abc", "/api/v1/extract?format=xml"] {
            let (state, _tx) = test_state();
            let request = upload_request(uri, "file", "a.png", "image/png", &png_bytes());

            let response = crate::app(state).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
            assert_eq!(body_json(response).await["error"], "bad_request");
        }
    }

    #[tokio::test]
    async fn test_shutdown_cancels_run_with_503() {
        let (state, tx) = test_state();
        tx.send(true).unwrap();
        let request = upload_request("/api/v1/extract", "file", "a.png", "image/png", &png_bytes());

        let response = crate::app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"], "run_cancelled");
    }

    #[test]
    fn test_document_id_falls_back_to_fingerprint() {
        let upload = Upload {
            file_name: None,
            content_type: None,
            data: b"%PDF-1.4".to_vec(),
        };
        assert_eq!(upload.document_id(), InputDocument::fingerprint(b"%PDF-1.4"));
        assert_eq!(upload.mime_hint(), None);

        let named = Upload {
            file_name: Some("report.final.pdf".to_string()),
            content_type: Some("application/octet-stream".to_string()),
            data: Vec::new(),
        };
        assert_eq!(named.document_id(), "report.final");
        assert_eq!(named.mime_hint().as_deref(), Some("application/pdf"));
    }
}
