//! # Engine Errors
//!
//! The caller-facing failure kinds. Every failure is synchronous and leaves
//! no partial state behind; the variant tells the caller what to do next
//! (resubmit with a fresh proof, ask the administrator, classify first).

use cspin_core::{ConfigError, Principal};
use cspin_sealed::SealedError;
use cspin_state::{ConfigStoreError, OutcomeError};
use thiserror::Error;

/// Errors returned by [`crate::SpinEngine`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The encrypted input or its proof was rejected. Not retryable
    /// without a fresh proof.
    #[error("invalid proof: {0}")]
    InvalidProof(String),

    /// The thresholds violate the ordering invariant.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(#[from] ConfigError),

    /// The caller lacks the role the operation requires.
    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        /// The rejected caller.
        caller: Principal,
        /// What was attempted.
        action: &'static str,
    },

    /// The principal has no classification yet.
    #[error("no outcome yet for {0}")]
    NoOutcomeYet(Principal),

    /// A classification or escalation for this principal is already
    /// running.
    #[error("classification already in flight for {0}")]
    ClassificationInFlight(Principal),

    /// A threshold update was prepared against a version that another
    /// update has since replaced.
    #[error("threshold version {prepared} no longer follows current version {current}")]
    ConfigurationStale {
        /// Version now in force.
        current: u64,
        /// Version of the rejected record.
        prepared: u64,
    },

    /// Unexpected failure inside the sealed-arithmetic backend.
    #[error("sealed backend error: {0}")]
    Sealed(SealedError),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidProof(_) => "INVALID_PROOF",
            Self::ConfigurationInvalid(_) => "CONFIGURATION_INVALID",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NoOutcomeYet(_) => "NO_OUTCOME_YET",
            Self::ClassificationInFlight(_) => "CLASSIFICATION_IN_FLIGHT",
            Self::ConfigurationStale { .. } => "CONFIGURATION_STALE",
            Self::Sealed(_) => "SEALED_BACKEND",
        }
    }
}

impl From<SealedError> for EngineError {
    fn from(err: SealedError) -> Self {
        match err {
            SealedError::InvalidProof(msg) => Self::InvalidProof(msg),
            other => Self::Sealed(other),
        }
    }
}

impl From<ConfigStoreError> for EngineError {
    fn from(err: ConfigStoreError) -> Self {
        match err {
            ConfigStoreError::Unauthorized { caller } => Self::Unauthorized {
                caller,
                action: "update thresholds",
            },
            ConfigStoreError::Invalid(e) => Self::ConfigurationInvalid(e),
            ConfigStoreError::Stale { current, prepared } => {
                Self::ConfigurationStale { current, prepared }
            }
        }
    }
}

impl From<OutcomeError> for EngineError {
    fn from(err: OutcomeError) -> Self {
        match err {
            OutcomeError::NoOutcomeYet(p) => Self::NoOutcomeYet(p),
            OutcomeError::InFlight(p) => Self::ClassificationInFlight(p),
        }
    }
}
