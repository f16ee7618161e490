//! # cspin-api: Binary Entry Point
//!
//! Starts the Axum HTTP server. Binds to `PORT` (default 8080).

use std::sync::Arc;

use cspin_api::state::{AppConfig, AppState};
use cspin_engine::SpinEngine;
use cspin_sealed::{SealedArithmetic, TransparentBackend};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");
    let port = config.port;

    let db_pool = cspin_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    // TODO: select a ciphertext-backed implementation once an FHE binding
    // implements SealedArithmetic.
    let backend: Arc<dyn SealedArithmetic> = Arc::new(TransparentBackend::new());
    tracing::warn!(
        backend = backend.backend_name(),
        "sealed backend stores plaintext, inputs are NOT confidential. Development use only."
    );

    let state = AppState::new(config, backend, db_pool).map_err(|e| {
        tracing::error!("Startup failed: {e}");
        e
    })?;

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    spawn_event_logger(&state.engine, state.metrics.clone());

    let app = cspin_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("cspin API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Log and count every engine change notification.
fn spawn_event_logger(engine: &SpinEngine, metrics: cspin_api::middleware::metrics::ApiMetrics) {
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    metrics.record_event(event.kind());
                    match serde_json::to_string(&event) {
                        Ok(json) => tracing::info!(kind = event.kind(), event = %json, "engine event"),
                        Err(e) => tracing::warn!(kind = event.kind(), error = %e, "engine event not serializable"),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged behind engine");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
