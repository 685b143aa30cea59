//! PageScan Server Library
//!
//! Page-level OCR for images and PDFs: rasterize a document into pages,
//! recognize the pages in parallel, and stitch the text back together in
//! page order. The HTTP server binary is in main.rs.
//!
//! # Modules
//!
//! - `document`: Input documents and page images
//! - `raster`: Page rasterization via MuPDF
//! - `ocr`: OCR engines and the per-page worker
//! - `pipeline`: Run coordination and result aggregation
//! - `routes`: HTTP endpoints

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod pipeline;
pub mod raster;
pub mod routes;
pub mod state;

use state::AppState;

/// Build the HTTP application around shared state
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config().server.max_upload_bytes;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1/health", routes::health::router())
        .nest("/api/v1/engines", routes::engines::router())
        .nest(
            "/api/v1/extract",
            routes::extract::router().layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum_test::TestServer;
    use serde_json::Value;
    use tokio::sync::watch;

    use super::*;
    use crate::config::Config;
    use crate::ocr::TesseractEngine;

    fn server() -> (TestServer, watch::Sender<bool>) {
        let mut config = Config::default();
        config.ocr.tesseract_path = "pagescan-missing-tesseract".to_string();
        config.ocr.max_concurrency = 2;

        let engine = TesseractEngine::new(&config.ocr.tesseract_path, &config.ocr.language);
        let (tx, rx) = watch::channel(false);
        let state = AppState::from_config(config, Arc::new(engine), rx).unwrap();
        (TestServer::new(app(state)).unwrap(), tx)
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (server, _tx) = server();

        for path in ["/health", "/api/v1/health"] {
            let response = server.get(path).await;
            response.assert_status_ok();
            let body: Value = response.json();
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["service"], "pagescan-server");
        }
    }

    #[tokio::test]
    async fn test_engines_reports_unavailable_binary() {
        let (server, _tx) = server();

        let response = server.get("/api/v1/engines").await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["name"], "tesseract");
        assert_eq!(body["available"], false);
        assert_eq!(body["defaultLanguage"], "eng");
        assert_eq!(body["dpi"], 300);
        assert_eq!(body["maxConcurrency"], 2);
        assert_eq!(body["pageTimeoutSecs"], 60);
    }
}
