//! # API Route Modules
//!
//! - `spins`: classification, outcome handles, win-flag escalation.
//! - `config`: threshold configuration read and administrative update.
//! - `capabilities`: decrypt-authorization queries against the ledger.

pub mod capabilities;
pub mod config;
pub mod spins;
