//! # cspin-state: Shared Classification State
//!
//! The three pieces of globally shared, mutable state that the engine
//! reads and writes. Each is internally synchronized with `parking_lot`
//! locks and is never held across an `.await`.
//!
//! - **Config** (`config.rs`): [`ThresholdConfigStore`] holds one versioned
//!   [`ConfigRecord`]. The administrator is the only writer; every write is
//!   validated and applied under a single write lock, so readers always see
//!   a whole record.
//!
//! - **Ledger** (`ledger.rs`): [`CapabilityLedger`] is the append-only
//!   relation `(handle, principal) -> granted_at` plus the monotonic
//!   public-readable flag. There is no revoke.
//!
//! - **Outcomes** (`outcome.rs`): [`OutcomeStore`] keeps the latest
//!   [`SpinOutcome`] per principal and hands out [`InFlightGuard`]s that
//!   stop a second classification for the same principal from starting
//!   while one is running.

pub mod config;
pub mod error;
pub mod ledger;
pub mod outcome;

pub use config::{ConfigRecord, ThresholdConfigStore};
pub use error::{ConfigStoreError, OutcomeError};
pub use ledger::{CapabilityGrant, CapabilityLedger, PublicReveal};
pub use outcome::{InFlightGuard, OutcomeStore, SpinOutcome};
