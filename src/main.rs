//! PageScan Server
//!
//! HTTP front end for page-level OCR of images and PDFs.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pagescan_server::config::Config;
use pagescan_server::ocr::{OcrEngine, TesseractEngine};
use pagescan_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pagescan_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting PageScan Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "OCR: language={}, dpi={}, concurrency={}, page timeout={}s, retries={}",
        config.ocr.language,
        config.ocr.dpi,
        config.ocr.max_concurrency,
        config.ocr.page_timeout_secs,
        config.ocr.timeout_retries
    );

    let engine = TesseractEngine::new(&config.ocr.tesseract_path, &config.ocr.language);
    if engine.is_available().await {
        tracing::info!("Tesseract found at '{}'", config.ocr.tesseract_path);
    } else {
        tracing::warn!(
            "Tesseract not available at '{}', pages will fail until it is installed",
            config.ocr.tesseract_path
        );
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app_state = AppState::from_config(config.clone(), Arc::new(engine), shutdown_rx)
        .context("Failed to create application state")?;

    let app = pagescan_server::app(app_state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    tracing::info!("PageScan Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
///
/// Also flips the shared shutdown flag so in-flight extraction runs are
/// cancelled instead of holding the server open.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    let _ = shutdown_tx.send(true);
}
