//! # Capability Query API
//!
//! The question a decryption gateway asks before releasing a plaintext:
//! may this principal decrypt this handle? A handle is decryptable by its
//! explicit grantees and, once published, by everyone.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use cspin_core::{HandleId, Principal, Timestamp};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::{CallerIdentity, Role};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CapabilityQuery {
    /// Principal to check. Defaults to the caller.
    pub principal: Option<String>,
}

/// One recorded grant.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GrantView {
    pub principal: String,
    #[schema(value_type = String, format = DateTime)]
    pub granted_at: Timestamp,
}

/// Authorization answer for one `(handle, principal)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CapabilityResponse {
    #[schema(value_type = String)]
    pub handle: HandleId,
    pub principal: String,
    pub authorized: bool,
    pub publicly_readable: bool,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub revealed_at: Option<Timestamp>,
    /// Every grant on the handle. Administrators only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grants: Option<Vec<GrantView>>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/capabilities/:handle", get(get_capability))
}

/// GET /v1/capabilities/:handle: May `principal` decrypt `handle`?
#[utoipa::path(
    get,
    path = "/v1/capabilities/{handle}",
    params(
        ("handle" = String, Path, description = "0x-prefixed 32-byte handle"),
        CapabilityQuery,
    ),
    responses(
        (status = 200, description = "Authorization answer", body = CapabilityResponse),
        (status = 422, description = "Malformed handle or principal", body = crate::error::ErrorBody),
    ),
    tag = "capabilities"
)]
async fn get_capability(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(handle): Path<String>,
    Query(query): Query<CapabilityQuery>,
) -> Result<Json<CapabilityResponse>, AppError> {
    let handle = HandleId::parse(&handle)?;
    let principal = match query.principal {
        Some(p) => Principal::new(p)?,
        None => caller.principal.clone(),
    };

    let ledger = state.engine.ledger();
    let grants = caller.has_role(Role::Admin).then(|| {
        ledger
            .grants_for(&handle)
            .into_iter()
            .map(|g| GrantView {
                principal: g.principal.to_string(),
                granted_at: g.granted_at,
            })
            .collect()
    });

    Ok(Json(CapabilityResponse {
        handle,
        authorized: ledger.is_authorized(&handle, &principal),
        publicly_readable: ledger.is_publicly_readable(&handle),
        revealed_at: ledger.revealed_at(&handle),
        principal: principal.to_string(),
        grants,
    }))
}
