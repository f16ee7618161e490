//! Threshold configuration persistence. A single row with `id = 1`.

use chrono::{DateTime, Utc};
use cspin_core::{Principal, ThresholdConfig, Timestamp};
use cspin_state::ConfigRecord;
use sqlx::PgPool;

use super::decode_err;

const SAVE_SQL: &str = "INSERT INTO threshold_config
         (id, modulus, jackpot_limit, big_win_limit, small_win_limit, version, updated_by, updated_at)
     VALUES (1, $1, $2, $3, $4, $5, $6, $7)
     ON CONFLICT (id) DO UPDATE SET
         modulus = EXCLUDED.modulus,
         jackpot_limit = EXCLUDED.jackpot_limit,
         big_win_limit = EXCLUDED.big_win_limit,
         small_win_limit = EXCLUDED.small_win_limit,
         version = EXCLUDED.version,
         updated_by = EXCLUDED.updated_by,
         updated_at = EXCLUDED.updated_at
     WHERE threshold_config.version < EXCLUDED.version";

/// Insert or replace the configuration row.
///
/// Returns `false`, writing nothing, if the stored version is not older
/// than `record.version`.
pub async fn save(pool: &PgPool, record: &ConfigRecord) -> Result<bool, sqlx::Error> {
    let c = &record.config;
    let version = i64::try_from(record.version)
        .map_err(|e| sqlx::Error::Protocol(format!("config version out of range: {e}")))?;
    let result = sqlx::query(SAVE_SQL)
        .bind(to_sql_int(c.modulus)?)
        .bind(to_sql_int(c.jackpot_limit)?)
        .bind(to_sql_int(c.big_win_limit)?)
        .bind(to_sql_int(c.small_win_limit)?)
        .bind(version)
        .bind(record.updated_by.as_str())
        .bind(*record.updated_at.as_datetime())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load the persisted configuration, if one was ever saved.
///
/// The ordering invariant is re-checked by the store on restore, not here.
pub async fn load(pool: &PgPool) -> Result<Option<ConfigRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, ThresholdRow>(
        "SELECT modulus, jackpot_limit, big_win_limit, small_win_limit, version, updated_by, updated_at
         FROM threshold_config WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(ThresholdRow::into_record).transpose()
}

fn to_sql_int(v: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(v).map_err(|e| sqlx::Error::Protocol(format!("threshold out of range: {e}")))
}

fn from_sql_int(v: i32) -> Result<u32, sqlx::Error> {
    u32::try_from(v).map_err(decode_err)
}

#[derive(sqlx::FromRow)]
struct ThresholdRow {
    modulus: i32,
    jackpot_limit: i32,
    big_win_limit: i32,
    small_win_limit: i32,
    version: i64,
    updated_by: String,
    updated_at: DateTime<Utc>,
}

impl ThresholdRow {
    fn into_record(self) -> Result<ConfigRecord, sqlx::Error> {
        Ok(ConfigRecord {
            config: ThresholdConfig {
                modulus: from_sql_int(self.modulus)?,
                jackpot_limit: from_sql_int(self.jackpot_limit)?,
                big_win_limit: from_sql_int(self.big_win_limit)?,
                small_win_limit: from_sql_int(self.small_win_limit)?,
            },
            version: u64::try_from(self.version).map_err(decode_err)?,
            updated_by: Principal::new(self.updated_by).map_err(decode_err)?,
            updated_at: Timestamp::from_datetime(self.updated_at),
        })
    }
}
