//! # Spin Classification API
//!
//! Players submit an encrypted input with its proof; the engine classifies
//! it under encryption and returns opaque handles. Nothing here ever
//! returns plaintext. Whether a handle can be decrypted is answered by the
//! capability routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use cspin_core::{HandleId, Principal, Timestamp};
use cspin_engine::{EngineError, Escalation, OutcomeHandles, PreparedSpin, PublicWinHandle};
use cspin_sealed::{EncryptedInput, SealedDomain};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────────────

/// An encrypted input and its proof of well-formedness, hex encoded.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassifyRequest {
    /// Sealed domain of the input. Only `uint16` is classified.
    #[serde(default = "default_domain")]
    #[schema(value_type = String, example = "uint16")]
    pub domain: SealedDomain,
    /// Ciphertext bytes, `0x`-prefixed hex.
    pub ciphertext: String,
    /// Input proof bound to the submitting principal, `0x`-prefixed hex.
    pub proof: String,
}

fn default_domain() -> SealedDomain {
    cspin_engine::INPUT_DOMAIN
}

impl Validate for ClassifyRequest {
    fn validate(&self) -> Result<(), String> {
        if self.ciphertext.trim().trim_start_matches("0x").is_empty() {
            return Err("ciphertext must not be empty".to_string());
        }
        Ok(())
    }
}

/// Handles of a principal's latest outcome. All `null` until the first
/// classification.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OutcomeHandlesResponse {
    pub principal: String,
    #[schema(value_type = Option<String>)]
    pub input_handle: Option<HandleId>,
    #[schema(value_type = Option<String>)]
    pub normalized_handle: Option<HandleId>,
    #[schema(value_type = Option<String>)]
    pub tier_handle: Option<HandleId>,
    #[schema(value_type = Option<String>)]
    pub win_handle: Option<HandleId>,
    pub decided: bool,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_updated_at: Option<Timestamp>,
}

impl OutcomeHandlesResponse {
    fn new(principal: &Principal, h: OutcomeHandles) -> Self {
        Self {
            principal: principal.to_string(),
            input_handle: h.input_handle,
            normalized_handle: h.normalized_handle,
            tier_handle: h.tier_handle,
            win_handle: h.win_handle,
            decided: h.decided,
            last_updated_at: h.last_updated_at,
        }
    }
}

/// A principal's win handle, whether or not it is public.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WinHandleResponse {
    pub principal: String,
    #[schema(value_type = Option<String>)]
    pub win_handle: Option<HandleId>,
    pub decided: bool,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub last_updated_at: Option<Timestamp>,
    /// Whether anyone may decrypt `win_handle` right now.
    pub publicly_readable: bool,
}

impl WinHandleResponse {
    fn new(principal: &Principal, w: PublicWinHandle) -> Self {
        Self {
            principal: principal.to_string(),
            win_handle: w.win_handle,
            decided: w.decided,
            last_updated_at: w.last_updated_at,
            publicly_readable: w.publicly_readable,
        }
    }
}

/// Result of publishing the caller's win flag.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EscalationResponse {
    #[schema(value_type = String)]
    pub win_handle: HandleId,
    /// `false` when the flag was already public.
    pub newly_published: bool,
    #[schema(value_type = String, format = DateTime)]
    pub revealed_at: Timestamp,
}

impl From<Escalation> for EscalationResponse {
    fn from(e: Escalation) -> Self {
        Self {
            win_handle: e.win_handle,
            newly_published: e.newly_published,
            revealed_at: e.revealed_at,
        }
    }
}

// ── Router ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/spins", post(classify_spin))
        .route("/v1/spins/escalate", post(escalate_win_flag))
        .route("/v1/spins/:principal", get(get_last_outcome))
        .route("/v1/spins/:principal/win", get(get_public_win_handle))
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/spins: Classify an encrypted input for the caller.
#[utoipa::path(
    post,
    path = "/v1/spins",
    request_body = ClassifyRequest,
    responses(
        (status = 200, description = "Outcome stored", body = OutcomeHandlesResponse),
        (status = 409, description = "Outcome update already in flight, or a newer outcome is stored", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid proof or thresholds", body = crate::error::ErrorBody),
    ),
    tag = "spins"
)]
async fn classify_spin(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<OutcomeHandlesResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let input = EncryptedInput::from_hex(req.domain, &req.ciphertext, &req.proof)
        .map_err(|e| EngineError::InvalidProof(e.to_string()))?;

    let guard = state.engine.begin(&caller.principal)?;

    // Sealed arithmetic is CPU-bound; keep it off the async workers.
    let engine = state.engine.clone();
    let prepared: PreparedSpin = tokio::task::spawn_blocking(move || engine.prepare_spin(guard, &input))
        .await
        .map_err(|e| AppError::Internal(format!("classification task failed: {e}")))??;

    if let Some(pool) = &state.db_pool {
        let persisted = crate::db::outcomes::persist_spin(
            pool,
            prepared.principal(),
            prepared.outcome(),
            prepared.grants(),
        )
        .await;
        match persisted {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(principal = %caller.principal, "stored outcome is newer, spin abandoned");
                state.engine.abandon_spin(prepared);
                return Err(AppError::Conflict(
                    "a newer outcome is already stored for this principal".into(),
                ));
            }
            Err(e) => {
                tracing::error!(principal = %caller.principal, error = %e, "failed to persist outcome");
                state.engine.abandon_spin(prepared);
                return Err(AppError::Internal(format!("outcome persist failed: {e}")));
            }
        }
    }

    let receipt = state.engine.commit_spin(prepared);
    Ok(Json(OutcomeHandlesResponse::new(&caller.principal, receipt.handles())))
}

/// GET /v1/spins/:principal: Latest outcome handles.
#[utoipa::path(
    get,
    path = "/v1/spins/{principal}",
    params(("principal" = String, Path, description = "Principal identifier")),
    responses(
        (status = 200, description = "Outcome handles; all null if undecided", body = OutcomeHandlesResponse),
        (status = 422, description = "Malformed principal", body = crate::error::ErrorBody),
    ),
    tag = "spins"
)]
async fn get_last_outcome(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(principal): Path<String>,
) -> Result<Json<OutcomeHandlesResponse>, AppError> {
    let principal = Principal::new(principal)?;
    let handles = state.engine.last_outcome(&principal);
    Ok(Json(OutcomeHandlesResponse::new(&principal, handles)))
}

/// GET /v1/spins/:principal/win: Win handle and its public status.
#[utoipa::path(
    get,
    path = "/v1/spins/{principal}/win",
    params(("principal" = String, Path, description = "Principal identifier")),
    responses(
        (status = 200, description = "Win handle", body = WinHandleResponse),
        (status = 422, description = "Malformed principal", body = crate::error::ErrorBody),
    ),
    tag = "spins"
)]
async fn get_public_win_handle(
    State(state): State<AppState>,
    _caller: CallerIdentity,
    Path(principal): Path<String>,
) -> Result<Json<WinHandleResponse>, AppError> {
    let principal = Principal::new(principal)?;
    let win = state.engine.public_win_handle(&principal);
    Ok(Json(WinHandleResponse::new(&principal, win)))
}

/// POST /v1/spins/escalate: Make the caller's latest win flag public.
#[utoipa::path(
    post,
    path = "/v1/spins/escalate",
    responses(
        (status = 200, description = "Win flag is public", body = EscalationResponse),
        (status = 404, description = "Caller has no outcome yet", body = crate::error::ErrorBody),
        (status = 409, description = "Caller's outcome is being updated", body = crate::error::ErrorBody),
    ),
    tag = "spins"
)]
async fn escalate_win_flag(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<EscalationResponse>, AppError> {
    let guard = state.engine.begin(&caller.principal)?;
    let prepared = state.engine.prepare_escalation(guard)?;

    let escalation = prepared.escalation();
    if let (true, Some(pool)) = (escalation.newly_published, &state.db_pool) {
        let reveal = cspin_state::PublicReveal {
            handle: escalation.win_handle,
            revealed_at: escalation.revealed_at,
        };
        if let Err(e) = crate::db::capabilities::insert_reveal(pool, &reveal).await {
            tracing::error!(principal = %caller.principal, error = %e, "failed to persist public flag");
            return Err(AppError::Internal(format!("public flag persist failed: {e}")));
        }
    }

    let escalation = state.engine.commit_escalation(prepared);
    Ok(Json(escalation.into()))
}
