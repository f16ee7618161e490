//! # cspin-api: HTTP Surface for Confidential Spin Classification
//!
//! ## API Surface
//!
//! | Prefix                 | Module                     |
//! |------------------------|----------------------------|
//! | `/v1/spins/*`          | [`routes::spins`]          |
//! | `/v1/config`           | [`routes::config`]         |
//! | `/v1/capabilities/*`   | [`routes::capabilities`]   |
//! | `/openapi.json`        | [`openapi`]                |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! Health checks and `/metrics` are mounted outside authentication.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Ciphertexts from a real FHE library run to tens of kilobytes.
const BODY_LIMIT: usize = 1024 * 1024;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
        default_principal: state.config.admin_principal.clone(),
    };
    let metrics_on = state.config.metrics_enabled;

    let mut api = Router::new()
        .merge(routes::spins::router())
        .merge(routes::config::router())
        .merge(routes::capabilities::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(from_fn(auth::auth_middleware));

    if metrics_on {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(axum::Extension(state.metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));
    if metrics_on {
        unauthenticated = unauthenticated.route("/metrics", axum::routing::get(prometheus_metrics));
    }
    let unauthenticated = unauthenticated.with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// GET /metrics: refresh the engine gauges, then encode.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.observe_engine(&state.engine.stats());
    match state.metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode Prometheus metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e).into_response()
        }
    }
}

/// Liveness check.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check. Fails while the database is unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}
