//! # cspin-core: Foundational Types
//!
//! The leaf of the cspin crate DAG. Defines the identifiers, timestamps and
//! configuration records that every other crate passes around, so that the
//! classification engine, the capability ledger and the API layer all agree
//! on one definition of each.
//!
//! ## Key Design Principles
//!
//! 1. **Newtypes for identifiers.** A [`Principal`] is never a bare string and
//!    a [`HandleId`] is never a bare byte array. Both validate on construction.
//!
//! 2. **One threshold record.** [`ThresholdConfig`] carries the ordering
//!    invariant `0 < jackpot < big_win < small_win <= modulus` and is the
//!    only place that invariant is checked.
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] wraps `chrono::DateTime<Utc>`.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cspin-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;
pub mod thresholds;

pub use digest::{hex_decode, hex_encode, sha256_bytes};
pub use error::{ConfigError, ValidationError};
pub use identity::{HandleId, Principal, ENGINE_PRINCIPAL};
pub use temporal::Timestamp;
pub use thresholds::{ThresholdConfig, MAX_MODULUS};
