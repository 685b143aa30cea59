//! OCR engine status endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Engine availability and the pipeline defaults runs start from
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub name: &'static str,
    pub available: bool,
    pub default_language: Option<String>,
    pub dpi: u32,
    pub max_concurrency: usize,
    pub page_timeout_secs: u64,
    pub timeout_retries: u32,
    pub use_text_layer: bool,
}

async fn engine_status(State(state): State<AppState>) -> Json<EngineStatus> {
    let pipeline = state.pipeline();
    let engine = pipeline.engine();
    let config = pipeline.config();

    let available = engine.is_available().await;
    if !available {
        tracing::warn!(engine = engine.name(), "OCR engine is not available");
    }

    Json(EngineStatus {
        name: engine.name(),
        available,
        default_language: config.language.clone(),
        dpi: config.dpi,
        max_concurrency: config.max_concurrency,
        page_timeout_secs: config.page_timeout.as_secs(),
        timeout_retries: config.timeout_retries,
        use_text_layer: config.use_text_layer,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(engine_status))
}
