//! # cspin-sealed: Sealed-Value Arithmetic
//!
//! The contract between the classification engine and the confidential
//! computation library that actually holds ciphertexts.
//!
//! ## Architecture
//!
//! - **Values** (`value.rs`): [`SealedValue`] is an opaque handle plus a
//!   domain tag. It carries no plaintext and copying it grants nothing.
//!   [`SealedPredicate`] is the boolean result of a comparison.
//!
//! - **Trait** (`traits.rs`): [`SealedArithmetic`] exposes `ingest`,
//!   `constant`, `less_than`, `greater_than` and `select`. Results of every
//!   operation are themselves sealed. The trait is sealed so that only
//!   backends reviewed in this crate can be plugged into the engine.
//!
//! - **Transparent backend** (`transparent.rs`): [`TransparentBackend`]
//!   stores plaintext behind the same handle interface. It lets the engine
//!   and the API run end to end and lets tests assert tier/win outputs
//!   directly. It provides no confidentiality.
//!
//! Capability grants are not part of this crate; they live in the ledger
//! in `cspin-state`, keyed by [`cspin_core::HandleId`].

pub mod traits;
#[cfg(feature = "transparent")]
pub mod transparent;
pub mod value;

pub use traits::{SealedArithmetic, SealedError};
#[cfg(feature = "transparent")]
pub use transparent::TransparentBackend;
pub use value::{EncryptedInput, SealedDomain, SealedPredicate, SealedValue};
