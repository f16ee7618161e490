//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! The [`SpinEngine`] owns every in-memory store. `AppState` adds the
//! optional Postgres pool (every mutation is persisted there before it is
//! committed in memory), the metrics registry, and the environment-derived
//! [`AppConfig`].

use std::sync::Arc;

use cspin_core::{Principal, ThresholdConfig, ValidationError};
use cspin_engine::{EngineError, SpinEngine};
use cspin_sealed::SealedArithmetic;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::auth::SecretToken;
use crate::middleware::metrics::ApiMetrics;

// -- Configuration ------------------------------------------------------------

/// Application configuration.
///
/// `Debug` never prints the bearer secret.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Shared bearer secret. `None` disables authentication.
    pub auth_token: Option<SecretToken>,
    /// The only principal allowed to change thresholds.
    pub admin_principal: Principal,
    /// Mount `/metrics` and record request metrics.
    pub metrics_enabled: bool,
    /// Thresholds installed at startup unless a persisted record exists.
    pub thresholds: ThresholdConfig,
}

/// An environment variable held an unusable value.
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("PORT must be a port number, got {0:?}")]
    InvalidPort(String),
    #[error("CSPIN_ADMIN_PRINCIPAL is invalid: {0}")]
    InvalidAdmin(#[source] ValidationError),
}

impl AppConfig {
    /// Read `PORT`, `AUTH_TOKEN`, `CSPIN_ADMIN_PRINCIPAL` and
    /// `CSPIN_METRICS_ENABLED`.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigLoadError> {
        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigLoadError::InvalidPort(raw))?,
            None => 8080,
        };
        let auth_token = get("AUTH_TOKEN")
            .filter(|t| !t.is_empty())
            .map(SecretToken::new);
        let admin_principal = Principal::new(get("CSPIN_ADMIN_PRINCIPAL").unwrap_or_else(|| "admin".into()))
            .map_err(ConfigLoadError::InvalidAdmin)?;
        let metrics_enabled = get("CSPIN_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            port,
            auth_token,
            admin_principal,
            metrics_enabled,
            thresholds: ThresholdConfig::default(),
        })
    }
}

// -- Application State --------------------------------------------------------

/// Startup failure.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The initial thresholds violate the ordering invariant.
    #[error("engine refused to start: {0}")]
    Engine(#[from] EngineError),
    /// The metrics registry rejected a collector.
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Shared application state accessible to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<SpinEngine>,
    pub metrics: ApiMetrics,
    /// When `Some`, every accepted mutation is also written to Postgres.
    pub db_pool: Option<PgPool>,
    pub config: AppConfig,
    /// Serializes threshold updates across the persist step.
    pub config_writes: Arc<Mutex<()>>,
}

impl AppState {
    /// Build the engine over `backend` with the configured thresholds.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn SealedArithmetic>,
        db_pool: Option<PgPool>,
    ) -> Result<Self, StartupError> {
        let engine = SpinEngine::new(backend, config.admin_principal.clone(), config.thresholds)?;
        Ok(Self {
            engine: Arc::new(engine),
            metrics: ApiMetrics::new()?,
            db_pool,
            config,
            config_writes: Arc::new(Mutex::new(())),
        })
    }

    /// Hydrate the engine's stores from the database.
    ///
    /// Called once on startup. A persisted threshold record replaces the
    /// configured defaults and is re-validated; an invalid one aborts
    /// startup.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let config = crate::db::thresholds::load(pool)
            .await
            .map_err(|e| format!("failed to load thresholds: {e}"))?;
        let config_version = match config {
            Some(record) => {
                let version = record.version;
                self.engine
                    .restore_config(record)
                    .map_err(|e| format!("persisted thresholds rejected: {e}"))?;
                Some(version)
            }
            None => None,
        };

        let outcomes = crate::db::outcomes::load_all(pool)
            .await
            .map_err(|e| format!("failed to load outcomes: {e}"))?;
        let outcome_count = outcomes.len();
        for (principal, outcome) in outcomes {
            self.engine.restore_outcome(principal, outcome);
        }

        let grants = crate::db::capabilities::load_grants(pool)
            .await
            .map_err(|e| format!("failed to load capability grants: {e}"))?;
        let grant_count = grants.len();
        self.engine.ledger().grant_all(&grants);

        let reveals = crate::db::capabilities::load_reveals(pool)
            .await
            .map_err(|e| format!("failed to load public handles: {e}"))?;
        let reveal_count = reveals.len();
        for reveal in reveals {
            self.engine.ledger().reveal_to_everyone(reveal);
        }

        tracing::info!(
            config_version = ?config_version,
            outcomes = outcome_count,
            grants = grant_count,
            public_handles = reveal_count,
            "Hydrated engine stores from database"
        );

        Ok(())
    }
}
