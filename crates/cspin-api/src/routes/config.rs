//! # Threshold Configuration API
//!
//! Anyone authenticated can read the current thresholds. Only the designated
//! administrator can replace them, and only with a triple that satisfies
//! `0 < jackpot_limit < big_win_limit < small_win_limit <= modulus`. A
//! rejected update leaves the previous record in force.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cspin_core::Timestamp;
use cspin_state::ConfigRecord;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{require_role, CallerIdentity, Role};
use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

/// New limits. The modulus is fixed at deployment.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetConfigRequest {
    pub small_win_limit: u32,
    pub big_win_limit: u32,
    pub jackpot_limit: u32,
}

/// The current threshold record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    pub modulus: u32,
    pub jackpot_limit: u32,
    pub big_win_limit: u32,
    pub small_win_limit: u32,
    /// Starts at 1; incremented by every accepted update.
    pub version: u64,
    pub updated_by: String,
    #[schema(value_type = String, format = DateTime)]
    pub updated_at: Timestamp,
}

impl From<ConfigRecord> for ConfigResponse {
    fn from(r: ConfigRecord) -> Self {
        Self {
            modulus: r.config.modulus,
            jackpot_limit: r.config.jackpot_limit,
            big_win_limit: r.config.big_win_limit,
            small_win_limit: r.config.small_win_limit,
            version: r.version,
            updated_by: r.updated_by.to_string(),
            updated_at: r.updated_at,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/config", get(get_config).put(set_config))
}

/// GET /v1/config: Current thresholds.
#[utoipa::path(
    get,
    path = "/v1/config",
    responses(
        (status = 200, description = "Current thresholds", body = ConfigResponse),
    ),
    tag = "config"
)]
async fn get_config(
    State(state): State<AppState>,
    _caller: CallerIdentity,
) -> Json<ConfigResponse> {
    Json(state.engine.config().into())
}

/// PUT /v1/config: Replace the three limits.
#[utoipa::path(
    put,
    path = "/v1/config",
    request_body = SetConfigRequest,
    responses(
        (status = 200, description = "Thresholds updated", body = ConfigResponse),
        (status = 403, description = "Caller is not the administrator", body = crate::error::ErrorBody),
        (status = 409, description = "A newer version was stored first", body = crate::error::ErrorBody),
        (status = 422, description = "Ordering invariant violated", body = crate::error::ErrorBody),
    ),
    tag = "config"
)]
async fn set_config(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<SetConfigRequest>, JsonRejection>,
) -> Result<Json<ConfigResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_json(body)?;

    // One update at a time, so the persisted and live versions agree.
    let _writing = state.config_writes.lock().await;
    let record = state.engine.prepare_config(
        &caller.principal,
        req.small_win_limit,
        req.big_win_limit,
        req.jackpot_limit,
    )?;

    if let Some(pool) = &state.db_pool {
        match crate::db::thresholds::save(pool, &record).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(version = record.version, "stored thresholds are newer, update abandoned");
                return Err(AppError::Conflict(
                    "a newer threshold version is already stored".into(),
                ));
            }
            Err(e) => {
                tracing::error!(version = record.version, error = %e, "failed to persist thresholds");
                return Err(AppError::Internal(format!("thresholds persist failed: {e}")));
            }
        }
    }

    let record = state.engine.commit_config(record)?;
    Ok(Json(record.into()))
}
