//! # Outcome Store
//!
//! Latest classification result per principal. A new classification
//! overwrites the previous record in place; no history is kept.
//!
//! Writes go through an [`InFlightGuard`] obtained from
//! [`OutcomeStore::begin`]. At most one guard exists per principal, so a
//! classification that re-enters for the same principal is rejected with
//! [`OutcomeError::InFlight`] instead of racing the first one. Dropping a
//! guard without committing leaves the stored record untouched.
//!
//! Guards own their slot rather than borrowing the store, so one can be
//! moved onto a blocking thread and held across a durable write.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cspin_core::{Principal, Timestamp};
use cspin_sealed::SealedValue;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::OutcomeError;

/// The sealed results of one principal's most recent classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    /// The ingested input.
    pub sealed_input: SealedValue,
    /// The input as classified. Same handle as `sealed_input`.
    pub sealed_normalized: SealedValue,
    /// Tier in `{0, 1, 2, 3}`.
    pub sealed_tier: SealedValue,
    /// `tier > 0`.
    pub sealed_win: SealedValue,
    /// Always `true` for a stored record.
    pub decided: bool,
    /// When the classification completed.
    pub last_updated_at: Timestamp,
}

impl SpinOutcome {
    /// The four sealed fields, in declaration order.
    pub fn sealed_values(&self) -> [SealedValue; 4] {
        [
            self.sealed_input,
            self.sealed_normalized,
            self.sealed_tier,
            self.sealed_win,
        ]
    }
}

/// Per-principal outcome records.
#[derive(Debug, Default)]
pub struct OutcomeStore {
    records: RwLock<HashMap<Principal, SpinOutcome>>,
    in_flight: Arc<Mutex<HashSet<Principal>>>,
}

impl OutcomeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the write slot for `principal`.
    ///
    /// # Errors
    ///
    /// [`OutcomeError::InFlight`] if a guard for `principal` is live.
    pub fn begin(&self, principal: &Principal) -> Result<InFlightGuard, OutcomeError> {
        if !self.in_flight.lock().insert(principal.clone()) {
            return Err(OutcomeError::InFlight(principal.clone()));
        }
        Ok(InFlightGuard {
            slots: Arc::clone(&self.in_flight),
            principal: principal.clone(),
        })
    }

    /// Store `outcome` as the guard's principal's latest result and release
    /// the slot. Returns the outcome it replaced.
    pub fn commit(&self, guard: InFlightGuard, outcome: SpinOutcome) -> Option<SpinOutcome> {
        self.records
            .write()
            .insert(guard.principal.clone(), outcome)
    }

    /// Latest outcome for `principal`, if any.
    pub fn get(&self, principal: &Principal) -> Option<SpinOutcome> {
        self.records.read().get(principal).cloned()
    }

    /// Latest outcome for `principal`, or [`OutcomeError::NoOutcomeYet`].
    pub fn require(&self, principal: &Principal) -> Result<SpinOutcome, OutcomeError> {
        self.get(principal)
            .ok_or_else(|| OutcomeError::NoOutcomeYet(principal.clone()))
    }

    /// Number of principals with a stored outcome.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no outcome has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Install a persisted outcome on startup.
    pub fn restore(&self, principal: Principal, outcome: SpinOutcome) {
        self.records.write().insert(principal, outcome);
    }
}

/// Exclusive write slot for one principal's outcome.
///
/// Released on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    slots: Arc<Mutex<HashSet<Principal>>>,
    principal: Principal,
}

impl InFlightGuard {
    /// The principal this guard is held for.
    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.slots.lock().remove(&self.principal);
    }
}
