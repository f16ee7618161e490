//! Capability ledger persistence. Both tables are append-only; inserts of
//! rows that already exist are ignored.

use chrono::{DateTime, Utc};
use cspin_core::{HandleId, Principal, Timestamp};
use cspin_state::{CapabilityGrant, PublicReveal};
use sqlx::{PgConnection, PgPool};

use super::decode_err;

/// Record grants inside an open transaction. Existing `(handle, principal)`
/// pairs keep their original `granted_at`.
pub(crate) async fn insert_grants(
    conn: &mut PgConnection,
    grants: &[CapabilityGrant],
) -> Result<(), sqlx::Error> {
    for grant in grants {
        sqlx::query(
            "INSERT INTO capability_grants (handle, principal, granted_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (handle, principal) DO NOTHING",
        )
        .bind(grant.handle.to_hex())
        .bind(grant.principal.as_str())
        .bind(*grant.granted_at.as_datetime())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Record that a handle became publicly readable.
pub async fn insert_reveal(pool: &PgPool, reveal: &PublicReveal) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO public_handles (handle, revealed_at)
         VALUES ($1, $2)
         ON CONFLICT (handle) DO NOTHING",
    )
    .bind(reveal.handle.to_hex())
    .bind(*reveal.revealed_at.as_datetime())
    .execute(pool)
    .await?;
    Ok(())
}

/// Load every grant.
pub async fn load_grants(pool: &PgPool) -> Result<Vec<CapabilityGrant>, sqlx::Error> {
    let rows = sqlx::query_as::<_, GrantRow>(
        "SELECT handle, principal, granted_at FROM capability_grants ORDER BY granted_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(CapabilityGrant {
                handle: HandleId::parse(&row.handle).map_err(decode_err)?,
                // Accepts the engine's own principal.
                principal: Principal::try_from(row.principal).map_err(decode_err)?,
                granted_at: Timestamp::from_datetime(row.granted_at),
            })
        })
        .collect()
}

/// Load every public flag.
pub async fn load_reveals(pool: &PgPool) -> Result<Vec<PublicReveal>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RevealRow>(
        "SELECT handle, revealed_at FROM public_handles ORDER BY revealed_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(PublicReveal {
                handle: HandleId::parse(&row.handle).map_err(decode_err)?,
                revealed_at: Timestamp::from_datetime(row.revealed_at),
            })
        })
        .collect()
}

#[derive(sqlx::FromRow)]
struct GrantRow {
    handle: String,
    principal: String,
    granted_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RevealRow {
    handle: String,
    revealed_at: DateTime<Utc>,
}
