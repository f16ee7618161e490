//! # Threshold Configuration Store
//!
//! Single-writer, many-reader holder of the global [`ThresholdConfig`].
//!
//! Every read returns a copy of the whole record taken under one read lock,
//! so a classification can never observe a mix of old and new limits.
//!
//! Writes are two-phase so that a durable copy can be written in between:
//! [`ThresholdConfigStore::prepare_limits`] authorizes and validates the
//! successor record without touching the store, and
//! [`ThresholdConfigStore::commit`] installs it only if it is still the
//! direct successor of the current version. A rejected or abandoned write
//! leaves the previous record untouched.

use cspin_core::{Principal, ThresholdConfig, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ConfigStoreError;

/// A versioned threshold configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigRecord {
    /// The thresholds.
    pub config: ThresholdConfig,
    /// Starts at 1 and increases by one on every accepted write.
    pub version: u64,
    /// Principal that wrote this version.
    pub updated_by: Principal,
    /// When this version was written.
    pub updated_at: Timestamp,
}

/// Holder of the current [`ConfigRecord`].
#[derive(Debug)]
pub struct ThresholdConfigStore {
    admin: Principal,
    record: RwLock<ConfigRecord>,
}

impl ThresholdConfigStore {
    /// Create the store with its initial configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigStoreError::Invalid`] if `initial` violates the ordering
    /// invariant. The service must not start in that case.
    pub fn new(admin: Principal, initial: ThresholdConfig) -> Result<Self, ConfigStoreError> {
        initial.validate()?;
        let record = ConfigRecord {
            config: initial,
            version: 1,
            updated_by: admin.clone(),
            updated_at: Timestamp::now(),
        };
        Ok(Self {
            admin,
            record: RwLock::new(record),
        })
    }

    /// The designated administrator.
    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    /// Consistent copy of the current record.
    pub fn snapshot(&self) -> ConfigRecord {
        self.record.read().clone()
    }

    /// The current thresholds.
    pub fn config(&self) -> ThresholdConfig {
        self.record.read().config
    }

    /// Build the successor record that replaces the three limits, keeping
    /// the current modulus. The store is not modified.
    ///
    /// # Errors
    ///
    /// [`ConfigStoreError::Unauthorized`] unless `caller` is the
    /// administrator; [`ConfigStoreError::Invalid`] if the limits violate the
    /// ordering invariant.
    pub fn prepare_limits(
        &self,
        caller: &Principal,
        small_win_limit: u32,
        big_win_limit: u32,
        jackpot_limit: u32,
    ) -> Result<ConfigRecord, ConfigStoreError> {
        self.authorize(caller)?;
        let current = self.snapshot();
        let config = current
            .config
            .with_limits(small_win_limit, big_win_limit, jackpot_limit)?;
        Ok(ConfigRecord {
            config,
            version: current.version + 1,
            updated_by: caller.clone(),
            updated_at: Timestamp::now(),
        })
    }

    /// Install a record built by [`Self::prepare_limits`].
    ///
    /// # Errors
    ///
    /// [`ConfigStoreError::Stale`] if another write landed since `next` was
    /// prepared. The store is left unchanged.
    pub fn commit(&self, next: ConfigRecord) -> Result<ConfigRecord, ConfigStoreError> {
        self.authorize(&next.updated_by)?;
        next.config.validate()?;
        let mut record = self.record.write();
        if next.version != record.version + 1 {
            return Err(ConfigStoreError::Stale {
                current: record.version,
                prepared: next.version,
            });
        }
        *record = next.clone();
        Ok(next)
    }

    /// Install a persisted record on startup. Re-validates it.
    pub fn restore(&self, record: ConfigRecord) -> Result<(), ConfigStoreError> {
        record.config.validate()?;
        *self.record.write() = record;
        Ok(())
    }

    fn authorize(&self, caller: &Principal) -> Result<(), ConfigStoreError> {
        if caller != &self.admin {
            return Err(ConfigStoreError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }
}
