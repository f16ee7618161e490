//! # Sealed Arithmetic Trait
//!
//! The primitives the engine consumes from the confidential computation
//! library. Every operation is a deterministic function of its sealed
//! inputs and returns sealed outputs; none reveals plaintext.
//!
//! ## Sealed Trait
//!
//! `SealedArithmetic` can only be implemented inside this crate. A backend
//! that leaks plaintext through its handles would break the whole
//! confidentiality boundary, so backends are added here, not downstream.

use cspin_core::{HandleId, Principal};
use thiserror::Error;

use crate::value::{EncryptedInput, SealedDomain, SealedPredicate, SealedValue};

/// Errors raised by a sealed-arithmetic backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SealedError {
    /// The input proof is empty, malformed, or does not verify.
    #[error("invalid input proof: {0}")]
    InvalidProof(String),

    /// The handle is not known to this backend.
    #[error("unknown handle {0}")]
    UnknownHandle(HandleId),

    /// Operands have incompatible domains.
    #[error("domain mismatch in {operation}: expected {expected}, got {actual}")]
    DomainMismatch {
        /// The operation that was attempted.
        operation: &'static str,
        /// Domain the operation required.
        expected: SealedDomain,
        /// Domain that was supplied.
        actual: SealedDomain,
    },

    /// A clear value does not fit the requested domain.
    #[error("value {value} does not fit domain {domain}")]
    ValueOutOfRange {
        /// The rejected clear value.
        value: u64,
        /// The target domain.
        domain: SealedDomain,
    },
}

mod private {
    /// Sealing marker. Not nameable outside `cspin-sealed`.
    pub trait Sealed {}
}

/// Arithmetic over values whose plaintext the caller cannot observe.
///
/// Object safe: the engine holds backends as `Arc<dyn SealedArithmetic>`.
pub trait SealedArithmetic: private::Sealed + Send + Sync {
    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Verify `input.proof` for `submitter` and import the ciphertext.
    ///
    /// # Errors
    ///
    /// [`SealedError::InvalidProof`] if the proof is empty, malformed, or
    /// fails verification, or if the ciphertext does not decode in the
    /// claimed domain.
    fn ingest(
        &self,
        input: &EncryptedInput,
        submitter: &Principal,
    ) -> Result<SealedValue, SealedError>;

    /// Lift a known clear value into the sealed domain. Not secret.
    fn constant(&self, domain: SealedDomain, clear: u64) -> Result<SealedValue, SealedError>;

    /// Sealed `a < b`. Both operands must share one integer domain.
    fn less_than(&self, a: &SealedValue, b: &SealedValue) -> Result<SealedPredicate, SealedError>;

    /// Sealed `a > b`. Both operands must share one integer domain.
    fn greater_than(
        &self,
        a: &SealedValue,
        b: &SealedValue,
    ) -> Result<SealedPredicate, SealedError>;

    /// Sealed `predicate ? if_true : if_false`, evaluated without
    /// branching on plaintext. Both branches must share one domain.
    fn select(
        &self,
        predicate: &SealedPredicate,
        if_true: &SealedValue,
        if_false: &SealedValue,
    ) -> Result<SealedValue, SealedError>;

    /// Release the ciphertext behind `value`. Unknown handles are ignored.
    /// Any copy of the handle is dead afterwards.
    fn discard(&self, value: &SealedValue);
}

#[cfg(feature = "transparent")]
impl private::Sealed for crate::transparent::TransparentBackend {}

/// Require both comparison operands to share an integer domain.
pub(crate) fn check_comparable(
    operation: &'static str,
    a: &SealedValue,
    b: &SealedValue,
) -> Result<(), SealedError> {
    if !a.domain().is_integer() {
        return Err(SealedError::DomainMismatch {
            operation,
            expected: SealedDomain::Uint32,
            actual: a.domain(),
        });
    }
    if a.domain() != b.domain() {
        return Err(SealedError::DomainMismatch {
            operation,
            expected: a.domain(),
            actual: b.domain(),
        });
    }
    Ok(())
}

/// Require both select branches to share a domain.
pub(crate) fn check_selectable(
    if_true: &SealedValue,
    if_false: &SealedValue,
) -> Result<(), SealedError> {
    if if_true.domain() != if_false.domain() {
        return Err(SealedError::DomainMismatch {
            operation: "select",
            expected: if_true.domain(),
            actual: if_false.domain(),
        });
    }
    Ok(())
}
