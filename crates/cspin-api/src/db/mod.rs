//! # Database Persistence Layer
//!
//! Postgres persistence for engine state via SQLx.
//!
//! The database is **optional**. When `DATABASE_URL` is set, every accepted
//! classification, threshold update, grant and escalation is written to
//! Postgres before the in-memory stores change; a failed write leaves them
//! untouched. Upserts never replace a newer row with an older one. The
//! stores are hydrated from Postgres on startup. When it is absent the API runs
//! in-memory only.
//!
//! Ciphertexts themselves are not stored here. Only handles are; the
//! sealed-value backend owns the ciphertexts.

pub mod capabilities;
pub mod outcomes;
pub mod thresholds;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Outcomes, grants and thresholds will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Wrap a row-level validation failure as a decode error.
pub(crate) fn decode_err(e: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(e))
}
