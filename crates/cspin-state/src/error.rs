//! Errors raised by the state stores.

use cspin_core::{ConfigError, Principal};
use thiserror::Error;

/// Errors from [`crate::ThresholdConfigStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigStoreError {
    /// The caller is not the designated administrator.
    #[error("principal {caller} is not the threshold administrator")]
    Unauthorized {
        /// The rejected caller.
        caller: Principal,
    },

    /// The configuration violates the ordering invariant.
    #[error("invalid threshold configuration: {0}")]
    Invalid(#[from] ConfigError),

    /// The record was prepared against a version that is no longer current.
    #[error("threshold record version {prepared} does not follow current version {current}")]
    Stale {
        /// Version in the store.
        current: u64,
        /// Version of the rejected record.
        prepared: u64,
    },
}

/// Errors from [`crate::OutcomeStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutcomeError {
    /// The principal has never completed a classification.
    #[error("no outcome recorded for {0}")]
    NoOutcomeYet(Principal),

    /// A classification or escalation for this principal is already running.
    #[error("an outcome update is already in flight for {0}")]
    InFlight(Principal),
}
