//! # Spin Engine
//!
//! The service object behind every external operation. Owns the threshold
//! store, the capability ledger and the outcome store, and holds the
//! sealed-arithmetic backend as a trait object.
//!
//! ## Classification Sequence
//!
//! 1. Claim the caller's in-flight slot (rejects re-entry).
//! 2. Take one consistent threshold snapshot and validate it.
//! 3. Ingest the encrypted input, verifying its proof.
//! 4. Run the select-chain.
//! 5. Grant the caller and the engine on every result handle.
//! 6. Commit the outcome and release the slot.
//! 7. Broadcast [`EngineEvent::SpinClassified`].
//!
//! Steps 1 to 4 mutate no store. Steps 5 and 6 cannot fail. A concurrent
//! `set_config` either lands before step 2 or does not affect this run.
//!
//! The sequence is exposed in phases ([`SpinEngine::begin`],
//! [`SpinEngine::prepare_spin`], [`SpinEngine::commit_spin`]) so a caller
//! can write the prepared outcome to a durable store between steps 4 and 5
//! and abandon it if that write fails. Escalation and threshold updates
//! are split the same way. [`SpinEngine::classify`],
//! [`SpinEngine::escalate_win_flag`] and [`SpinEngine::set_config`] run
//! all phases at once.
//!
//! ## Engine Grants
//!
//! The engine principal is granted on every value it produces and these
//! grants are never removed, so later operations (escalation, re-deriving
//! against new thresholds) can always use them.

use std::sync::Arc;

use cspin_core::{HandleId, Principal, Timestamp};
use cspin_sealed::{EncryptedInput, SealedArithmetic};
use cspin_state::{
    CapabilityGrant, CapabilityLedger, ConfigRecord, InFlightGuard, OutcomeStore, PublicReveal,
    SpinOutcome, ThresholdConfigStore,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::classify::{classify, INPUT_DOMAIN};
use crate::error::EngineError;
use crate::event::EngineEvent;

const EVENT_CAPACITY: usize = 256;

/// Handle view of a principal's latest outcome. Handles are `None` until
/// the first classification.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeHandles {
    pub input_handle: Option<HandleId>,
    pub normalized_handle: Option<HandleId>,
    pub tier_handle: Option<HandleId>,
    pub win_handle: Option<HandleId>,
    pub decided: bool,
    pub last_updated_at: Option<Timestamp>,
}

impl From<&SpinOutcome> for OutcomeHandles {
    fn from(o: &SpinOutcome) -> Self {
        Self {
            input_handle: Some(o.sealed_input.handle()),
            normalized_handle: Some(o.sealed_normalized.handle()),
            tier_handle: Some(o.sealed_tier.handle()),
            win_handle: Some(o.sealed_win.handle()),
            decided: o.decided,
            last_updated_at: Some(o.last_updated_at),
        }
    }
}

/// The win handle of a principal, public or not.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PublicWinHandle {
    pub win_handle: Option<HandleId>,
    pub decided: bool,
    pub last_updated_at: Option<Timestamp>,
    /// Whether the ledger currently lets anyone decrypt `win_handle`.
    pub publicly_readable: bool,
}

/// Result of a committed classification.
#[derive(Debug, Clone)]
pub struct SpinReceipt {
    /// The stored outcome.
    pub outcome: SpinOutcome,
    /// Grants recorded by this classification.
    pub grants: Vec<CapabilityGrant>,
}

impl SpinReceipt {
    /// Handle view of the stored outcome.
    pub fn handles(&self) -> OutcomeHandles {
        OutcomeHandles::from(&self.outcome)
    }
}

/// A computed classification waiting to be committed. Holds the caller's
/// outcome slot.
#[derive(Debug)]
#[must_use = "commit or abandon a prepared spin"]
pub struct PreparedSpin {
    guard: InFlightGuard,
    config_version: u64,
    outcome: SpinOutcome,
    grants: Vec<CapabilityGrant>,
}

impl PreparedSpin {
    /// The principal being classified.
    pub fn principal(&self) -> &Principal {
        self.guard.principal()
    }

    /// The outcome that will be stored.
    pub fn outcome(&self) -> &SpinOutcome {
        &self.outcome
    }

    /// The grants that will be recorded.
    pub fn grants(&self) -> &[CapabilityGrant] {
        &self.grants
    }
}

/// An escalation waiting to be committed. Holds the caller's outcome slot.
#[derive(Debug)]
#[must_use = "commit or drop a prepared escalation"]
pub struct PreparedEscalation {
    guard: InFlightGuard,
    escalation: Escalation,
}

impl PreparedEscalation {
    /// What committing will record.
    pub fn escalation(&self) -> &Escalation {
        &self.escalation
    }
}

/// Result of a win-flag escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escalation {
    pub win_handle: HandleId,
    /// `false` if the handle was already public.
    pub newly_published: bool,
    pub revealed_at: Timestamp,
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub outcomes: usize,
    pub grants: usize,
    pub public_handles: usize,
    pub config_version: u64,
}

/// The classification service.
pub struct SpinEngine {
    backend: Arc<dyn SealedArithmetic>,
    engine_principal: Principal,
    config: ThresholdConfigStore,
    ledger: CapabilityLedger,
    outcomes: OutcomeStore,
    events: broadcast::Sender<EngineEvent>,
}

impl std::fmt::Debug for SpinEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinEngine")
            .field("backend", &self.backend.backend_name())
            .field("config", &self.config)
            .field("outcomes", &self.outcomes.len())
            .finish_non_exhaustive()
    }
}

impl SpinEngine {
    /// Create an engine with `initial` thresholds administered by `admin`.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigurationInvalid`] if `initial` violates the
    /// ordering invariant. The engine refuses to come up in that case.
    pub fn new(
        backend: Arc<dyn SealedArithmetic>,
        admin: Principal,
        initial: cspin_core::ThresholdConfig,
    ) -> Result<Self, EngineError> {
        let config = ThresholdConfigStore::new(admin, initial)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        tracing::info!(
            backend = backend.backend_name(),
            admin = %config.admin(),
            "spin engine initialized"
        );
        Ok(Self {
            backend,
            engine_principal: Principal::engine(),
            config,
            ledger: CapabilityLedger::new(),
            outcomes: OutcomeStore::new(),
            events,
        })
    }

    /// Claim `caller`'s outcome slot. Held until the classification or
    /// escalation built on it is committed or dropped.
    pub fn begin(&self, caller: &Principal) -> Result<InFlightGuard, EngineError> {
        self.outcomes.begin(caller).map_err(|e| {
            tracing::warn!(principal = %caller, "rejected: outcome update already in flight");
            EngineError::from(e)
        })
    }

    /// Steps 2 to 4 of a classification. Nothing is committed; the backend
    /// holds the new input, tier and win values until
    /// [`Self::commit_spin`] or [`Self::abandon_spin`].
    pub fn prepare_spin(
        &self,
        guard: InFlightGuard,
        input: &EncryptedInput,
    ) -> Result<PreparedSpin, EngineError> {
        let caller = guard.principal().clone();

        let snapshot = self.config.snapshot();
        if let Err(e) = snapshot.config.validate() {
            tracing::warn!(principal = %caller, version = snapshot.version, error = %e, "classification refused: thresholds invalid");
            return Err(e.into());
        }

        if input.domain != INPUT_DOMAIN {
            return Err(EngineError::InvalidProof(format!(
                "input must be {INPUT_DOMAIN}, got {}",
                input.domain
            )));
        }
        let sealed = self.backend.ingest(input, &caller).map_err(|e| {
            tracing::warn!(principal = %caller, error = %e, "input rejected at ingestion");
            EngineError::from(e)
        })?;

        let result = match classify(self.backend.as_ref(), sealed, &snapshot.config) {
            Ok(result) => result,
            Err(e) => {
                self.backend.discard(&sealed);
                return Err(e);
            }
        };

        let mut handles = vec![result.input.handle()];
        for h in [result.normalized.handle(), result.tier.handle(), result.win.handle()] {
            if !handles.contains(&h) {
                handles.push(h);
            }
        }
        let now = Timestamp::now();
        let grants = handles
            .iter()
            .flat_map(|handle| {
                [caller.clone(), self.engine_principal.clone()]
                    .into_iter()
                    .map(move |principal| CapabilityGrant {
                        handle: *handle,
                        principal,
                        granted_at: now,
                    })
            })
            .collect();

        Ok(PreparedSpin {
            guard,
            config_version: snapshot.version,
            outcome: SpinOutcome {
                sealed_input: result.input,
                sealed_normalized: result.normalized,
                sealed_tier: result.tier,
                sealed_win: result.win,
                decided: true,
                last_updated_at: now,
            },
            grants,
        })
    }

    /// Steps 5 to 7: record the grants, replace the stored outcome and
    /// notify. Cannot fail.
    ///
    /// Values of the replaced outcome are released from the backend unless
    /// they were made public.
    pub fn commit_spin(&self, prepared: PreparedSpin) -> SpinReceipt {
        let PreparedSpin {
            guard,
            config_version,
            outcome,
            grants,
        } = prepared;
        let caller = guard.principal().clone();

        let grants = self.ledger.grant_all(&grants);
        if let Some(replaced) = self.outcomes.commit(guard, outcome.clone()) {
            self.release(&replaced);
        }

        let receipt = SpinReceipt { outcome, grants };
        tracing::info!(
            principal = %caller,
            config_version,
            tier_handle = %receipt.outcome.sealed_tier.handle(),
            win_handle = %receipt.outcome.sealed_win.handle(),
            "spin classified"
        );
        self.emit(EngineEvent::SpinClassified {
            principal: caller,
            handles: receipt.handles(),
        });
        receipt
    }

    /// Drop a prepared classification and release its backend values. The
    /// stored outcome and the ledger are untouched.
    pub fn abandon_spin(&self, prepared: PreparedSpin) {
        tracing::debug!(principal = %prepared.guard.principal(), "prepared classification abandoned");
        self.release(&prepared.outcome);
    }

    /// Classify `input` for `caller` and store the outcome.
    pub fn classify(
        &self,
        caller: &Principal,
        input: &EncryptedInput,
    ) -> Result<SpinReceipt, EngineError> {
        let guard = self.begin(caller)?;
        let prepared = self.prepare_spin(guard, input)?;
        Ok(self.commit_spin(prepared))
    }

    /// Handle view of `principal`'s latest outcome. Read only.
    pub fn last_outcome(&self, principal: &Principal) -> OutcomeHandles {
        self.outcomes
            .get(principal)
            .map(|o| OutcomeHandles::from(&o))
            .unwrap_or_default()
    }

    /// `principal`'s win handle whether or not it is public. Read only.
    pub fn public_win_handle(&self, principal: &Principal) -> PublicWinHandle {
        match self.outcomes.get(principal) {
            Some(o) => PublicWinHandle {
                win_handle: Some(o.sealed_win.handle()),
                decided: o.decided,
                last_updated_at: Some(o.last_updated_at),
                publicly_readable: self.ledger.is_publicly_readable(&o.sealed_win.handle()),
            },
            None => PublicWinHandle::default(),
        }
    }

    /// Work out what publishing the guard principal's latest win flag
    /// would do, without doing it.
    pub fn prepare_escalation(&self, guard: InFlightGuard) -> Result<PreparedEscalation, EngineError> {
        let outcome = self.outcomes.require(guard.principal()).map_err(|e| {
            tracing::warn!(principal = %guard.principal(), "escalation rejected: no outcome yet");
            EngineError::from(e)
        })?;
        let win_handle = outcome.sealed_win.handle();
        let escalation = match self.ledger.revealed_at(&win_handle) {
            Some(revealed_at) => Escalation {
                win_handle,
                newly_published: false,
                revealed_at,
            },
            None => Escalation {
                win_handle,
                newly_published: true,
                revealed_at: Timestamp::now(),
            },
        };
        Ok(PreparedEscalation { guard, escalation })
    }

    /// Set the public flag recorded in `prepared`. Cannot fail.
    pub fn commit_escalation(&self, prepared: PreparedEscalation) -> Escalation {
        let PreparedEscalation { guard, escalation } = prepared;
        let caller = guard.principal();
        let reveal = PublicReveal {
            handle: escalation.win_handle,
            revealed_at: escalation.revealed_at,
        };
        if escalation.newly_published && self.ledger.reveal_to_everyone(reveal) {
            tracing::info!(principal = %caller, win_handle = %escalation.win_handle, "win flag published");
            self.emit(EngineEvent::WinFlagPublished {
                principal: caller.clone(),
                win_handle: escalation.win_handle,
                revealed_at: escalation.revealed_at,
            });
        } else {
            tracing::debug!(principal = %caller, win_handle = %escalation.win_handle, "win flag already public");
        }
        escalation
    }

    /// Make `caller`'s latest win flag decryptable by anyone.
    ///
    /// Only the win handle is published; input, normalized and tier stay
    /// private. Calling again is a no-op that emits no event.
    pub fn escalate_win_flag(&self, caller: &Principal) -> Result<Escalation, EngineError> {
        let guard = self.begin(caller)?;
        let prepared = self.prepare_escalation(guard)?;
        Ok(self.commit_escalation(prepared))
    }

    /// Build the next threshold record. Administrator only. The live
    /// configuration is not changed until [`Self::commit_config`].
    pub fn prepare_config(
        &self,
        caller: &Principal,
        small_win_limit: u32,
        big_win_limit: u32,
        jackpot_limit: u32,
    ) -> Result<ConfigRecord, EngineError> {
        self.config
            .prepare_limits(caller, small_win_limit, big_win_limit, jackpot_limit)
            .map_err(|e| {
                tracing::warn!(principal = %caller, error = %e, "threshold update rejected");
                EngineError::from(e)
            })
    }

    /// Install a record from [`Self::prepare_config`] and notify.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigurationStale`] if another update landed first.
    pub fn commit_config(&self, record: ConfigRecord) -> Result<ConfigRecord, EngineError> {
        let record = self.config.commit(record).map_err(|e| {
            tracing::warn!(error = %e, "threshold commit rejected");
            EngineError::from(e)
        })?;
        let c = record.config;
        tracing::info!(
            version = record.version,
            small_win_limit = c.small_win_limit,
            big_win_limit = c.big_win_limit,
            jackpot_limit = c.jackpot_limit,
            "thresholds updated"
        );
        self.emit(EngineEvent::ThresholdsUpdated {
            record: record.clone(),
        });
        Ok(record)
    }

    /// Replace the three limits. Administrator only.
    pub fn set_config(
        &self,
        caller: &Principal,
        small_win_limit: u32,
        big_win_limit: u32,
        jackpot_limit: u32,
    ) -> Result<ConfigRecord, EngineError> {
        let record = self.prepare_config(caller, small_win_limit, big_win_limit, jackpot_limit)?;
        self.commit_config(record)
    }

    /// Current threshold record.
    pub fn config(&self) -> ConfigRecord {
        self.config.snapshot()
    }

    /// The designated administrator.
    pub fn admin(&self) -> &Principal {
        self.config.admin()
    }

    /// Subscribe to change notifications emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// The capability ledger, for authorization queries.
    pub fn ledger(&self) -> &CapabilityLedger {
        &self.ledger
    }

    /// Whether `principal` may decrypt `handle`.
    pub fn is_authorized(&self, handle: &HandleId, principal: &Principal) -> bool {
        self.ledger.is_authorized(handle, principal)
    }

    /// Current counters.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            outcomes: self.outcomes.len(),
            grants: self.ledger.grant_count(),
            public_handles: self.ledger.public_count(),
            config_version: self.config.snapshot().version,
        }
    }

    /// Install persisted state on startup.
    pub fn restore_config(&self, record: ConfigRecord) -> Result<(), EngineError> {
        self.config.restore(record)?;
        Ok(())
    }

    /// Install a persisted outcome on startup.
    pub fn restore_outcome(&self, principal: Principal, outcome: SpinOutcome) {
        self.outcomes.restore(principal, outcome);
    }

    /// Release the values of an outcome that is no longer stored. Public
    /// handles stay readable.
    fn release(&self, outcome: &SpinOutcome) {
        for value in outcome.sealed_values() {
            if !self.ledger.is_publicly_readable(&value.handle()) {
                self.backend.discard(&value);
            }
        }
    }

    fn emit(&self, event: EngineEvent) {
        // No receivers is not an error.
        let _ = self.events.send(event);
    }
}
