//! # OpenAPI Document Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "cspin API",
        version = "0.1.0",
        description = "Confidential spin classification: encrypted inputs are tiered under encryption, results are returned as opaque handles, and decrypt rights are governed by a capability ledger.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::spins::classify_spin,
        crate::routes::spins::get_last_outcome,
        crate::routes::spins::get_public_win_handle,
        crate::routes::spins::escalate_win_flag,
        crate::routes::config::get_config,
        crate::routes::config::set_config,
        crate::routes::capabilities::get_capability,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::spins::ClassifyRequest,
        crate::routes::spins::OutcomeHandlesResponse,
        crate::routes::spins::WinHandleResponse,
        crate::routes::spins::EscalationResponse,
        crate::routes::config::SetConfigRequest,
        crate::routes::config::ConfigResponse,
        crate::routes::capabilities::CapabilityResponse,
        crate::routes::capabilities::GrantView,
    )),
    tags(
        (name = "spins", description = "Classification, outcome handles and win-flag escalation"),
        (name = "config", description = "Threshold configuration"),
        (name = "capabilities", description = "Decrypt authorization queries"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
