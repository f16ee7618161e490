//! # cspin-engine: Confidential Classification
//!
//! Classifies a sealed input against the administrator's thresholds
//! without ever seeing its plaintext, and manages who may decrypt the
//! results.
//!
//! ## Layers
//!
//! - [`classify`] is a pure function from a sealed input and a threshold
//!   snapshot to four sealed results. It only talks to a
//!   [`cspin_sealed::SealedArithmetic`] backend and touches no shared
//!   state, so it can be tested directly against the transparent backend.
//!
//! - [`SpinEngine`] owns the shared stores from `cspin-state` and wraps
//!   `classify` in the all-or-nothing sequence: claim the principal's
//!   in-flight slot, snapshot the config, ingest, compute, grant, commit,
//!   notify. Any failure before the commit leaves every store unchanged.
//!
//! - [`EngineEvent`]s are broadcast after each successful state change
//!   for external observers.

pub mod classify;
pub mod engine;
pub mod error;
pub mod event;

pub use classify::{classify, Classification, INPUT_DOMAIN, TIER_DOMAIN};
pub use engine::{
    EngineStats, Escalation, OutcomeHandles, PreparedEscalation, PreparedSpin, PublicWinHandle,
    SpinEngine, SpinReceipt,
};
pub use error::EngineError;
pub use event::EngineEvent;
