//! Per-principal outcome persistence.
//!
//! Only handles are stored. Their domains are fixed by the classification
//! algorithm and reattached on load.

use chrono::{DateTime, Utc};
use cspin_core::{HandleId, Principal, Timestamp};
use cspin_engine::{INPUT_DOMAIN, TIER_DOMAIN};
use cspin_sealed::{SealedDomain, SealedValue};
use cspin_state::{CapabilityGrant, SpinOutcome};
use sqlx::PgPool;

use super::decode_err;

const UPSERT_SQL: &str = "INSERT INTO spin_outcomes
         (principal, input_handle, normalized_handle, tier_handle, win_handle, decided, last_updated_at)
     VALUES ($1, $2, $3, $4, $5, $6, $7)
     ON CONFLICT (principal) DO UPDATE SET
         input_handle = EXCLUDED.input_handle,
         normalized_handle = EXCLUDED.normalized_handle,
         tier_handle = EXCLUDED.tier_handle,
         win_handle = EXCLUDED.win_handle,
         decided = EXCLUDED.decided,
         last_updated_at = EXCLUDED.last_updated_at
     WHERE spin_outcomes.last_updated_at <= EXCLUDED.last_updated_at";

/// Store `principal`'s outcome and its grants in one transaction.
///
/// Returns `false`, writing nothing, if the stored row is newer than
/// `outcome`.
pub async fn persist_spin(
    pool: &PgPool,
    principal: &Principal,
    outcome: &SpinOutcome,
    grants: &[CapabilityGrant],
) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let written = sqlx::query(UPSERT_SQL)
        .bind(principal.as_str())
        .bind(outcome.sealed_input.handle().to_hex())
        .bind(outcome.sealed_normalized.handle().to_hex())
        .bind(outcome.sealed_tier.handle().to_hex())
        .bind(outcome.sealed_win.handle().to_hex())
        .bind(outcome.decided)
        .bind(*outcome.last_updated_at.as_datetime())
        .execute(&mut *tx)
        .await?
        .rows_affected()
        > 0;
    if !written {
        tx.rollback().await?;
        return Ok(false);
    }
    super::capabilities::insert_grants(&mut *tx, grants).await?;
    tx.commit().await?;
    Ok(true)
}

/// Load every stored outcome.
pub async fn load_all(pool: &PgPool) -> Result<Vec<(Principal, SpinOutcome)>, sqlx::Error> {
    let rows = sqlx::query_as::<_, OutcomeRow>(
        "SELECT principal, input_handle, normalized_handle, tier_handle, win_handle, decided, last_updated_at
         FROM spin_outcomes ORDER BY principal",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(OutcomeRow::into_outcome).collect()
}

#[derive(sqlx::FromRow)]
struct OutcomeRow {
    principal: String,
    input_handle: String,
    normalized_handle: String,
    tier_handle: String,
    win_handle: String,
    decided: bool,
    last_updated_at: DateTime<Utc>,
}

impl OutcomeRow {
    fn into_outcome(self) -> Result<(Principal, SpinOutcome), sqlx::Error> {
        let sealed = |hex: &str, domain: SealedDomain| -> Result<SealedValue, sqlx::Error> {
            let handle = HandleId::parse(hex).map_err(decode_err)?;
            Ok(SealedValue::from_parts(handle, domain))
        };
        let principal = Principal::new(self.principal).map_err(decode_err)?;
        let outcome = SpinOutcome {
            sealed_input: sealed(&self.input_handle, INPUT_DOMAIN)?,
            sealed_normalized: sealed(&self.normalized_handle, INPUT_DOMAIN)?,
            sealed_tier: sealed(&self.tier_handle, TIER_DOMAIN)?,
            sealed_win: sealed(&self.win_handle, SealedDomain::Bool)?,
            decided: self.decided,
            last_updated_at: Timestamp::from_datetime(self.last_updated_at),
        };
        Ok((principal, outcome))
    }
}
