//! # Select-Chain Classification
//!
//! Tiering over a sealed input without branching on its plaintext. Every
//! comparison is evaluated, and a sealed `select` picks the result.
//!
//! ```text
//! tier := 0
//! tier := input < small_win_limit ? 1 : tier
//! tier := input < big_win_limit   ? 2 : tier
//! tier := input < jackpot_limit   ? 3 : tier
//! win  := tier > 0
//! ```
//!
//! The three selects must run in exactly this order. Because
//! `jackpot < big_win < small_win`, each later select overwrites the
//! earlier ones on a strictly smaller input range. Reordering them changes
//! the classification.
//!
//! The caller is responsible for keeping the plaintext in `[0, modulus)`.
//! Nothing here can check that under encryption.
//!
//! Limit and level constants, predicates and intermediate tiers are
//! released before returning, on success and on error. Only `tier` and
//! `win` are new values owned by the caller afterwards.

use cspin_core::ThresholdConfig;
use cspin_sealed::{SealedArithmetic, SealedDomain, SealedError, SealedValue};

use crate::error::EngineError;

/// Domain of classified inputs.
pub const INPUT_DOMAIN: SealedDomain = SealedDomain::Uint16;

/// Domain of the tier result.
pub const TIER_DOMAIN: SealedDomain = SealedDomain::Uint8;

/// The sealed results of one classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// The ingested input.
    pub input: SealedValue,
    /// The value the thresholds were applied to.
    pub normalized: SealedValue,
    /// Tier in `{0, 1, 2, 3}`.
    pub tier: SealedValue,
    /// Sealed boolean `tier > 0`.
    pub win: SealedValue,
}

/// Classify `input` against `config`.
///
/// # Errors
///
/// [`EngineError::ConfigurationInvalid`] if `config` violates the ordering
/// invariant; no sealed operation is issued in that case.
/// [`EngineError::Sealed`] if `input` is not in [`INPUT_DOMAIN`] or the
/// backend fails.
pub fn classify(
    backend: &dyn SealedArithmetic,
    input: SealedValue,
    config: &ThresholdConfig,
) -> Result<Classification, EngineError> {
    config.validate()?;
    if input.domain() != INPUT_DOMAIN {
        return Err(EngineError::Sealed(SealedError::DomainMismatch {
            operation: "classify",
            expected: INPUT_DOMAIN,
            actual: input.domain(),
        }));
    }

    let normalized = input;
    let mut scratch = Scratch::new(backend);

    let steps = [
        (config.small_win_limit, 1),
        (config.big_win_limit, 2),
        (config.jackpot_limit, 3),
    ];

    let mut tier = scratch.track(backend.constant(TIER_DOMAIN, 0)?);
    for (limit, level) in steps {
        let limit = scratch.track(backend.constant(INPUT_DOMAIN, u64::from(limit))?);
        let below = backend.less_than(&normalized, &limit)?;
        scratch.track(below.as_value());
        let level = scratch.track(backend.constant(TIER_DOMAIN, level)?);
        tier = scratch.track(backend.select(&below, &level, &tier)?);
    }

    let zero = scratch.track(backend.constant(TIER_DOMAIN, 0)?);
    let win = backend.greater_than(&tier, &zero)?.as_value();
    scratch.keep(&tier);

    Ok(Classification {
        input,
        normalized,
        tier,
        win,
    })
}

/// Values created during one classification, discarded on drop.
struct Scratch<'a> {
    backend: &'a dyn SealedArithmetic,
    values: Vec<SealedValue>,
}

impl<'a> Scratch<'a> {
    fn new(backend: &'a dyn SealedArithmetic) -> Self {
        Self {
            backend,
            values: Vec::with_capacity(16),
        }
    }

    fn track(&mut self, value: SealedValue) -> SealedValue {
        self.values.push(value);
        value
    }

    fn keep(&mut self, value: &SealedValue) {
        self.values.retain(|v| v != value);
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        for value in &self.values {
            self.backend.discard(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cspin_core::Principal;
    use cspin_sealed::TransparentBackend;

    fn run(backend: &TransparentBackend, config: &ThresholdConfig, p: u64) -> (u64, u64) {
        let who = Principal::new("alice").unwrap();
        let input = TransparentBackend::encrypt(INPUT_DOMAIN, p, &who).unwrap();
        let sealed = backend.ingest(&input, &who).unwrap();
        let c = classify(backend, sealed, config).unwrap();
        (backend.reveal(&c.tier).unwrap(), backend.reveal(&c.win).unwrap())
    }

    #[test]
    fn worked_examples() {
        let backend = TransparentBackend::new();
        let config = ThresholdConfig::default();
        assert_eq!(run(&backend, &config, 30), (3, 1));
        assert_eq!(run(&backend, &config, 100), (2, 1));
        assert_eq!(run(&backend, &config, 500), (1, 1));
        assert_eq!(run(&backend, &config, 9999), (0, 0));
    }

    #[test]
    fn boundaries_fall_to_lower_tier() {
        let backend = TransparentBackend::new();
        let config = ThresholdConfig::default();
        assert_eq!(run(&backend, &config, 0), (3, 1));
        assert_eq!(run(&backend, &config, 49), (3, 1));
        assert_eq!(run(&backend, &config, 50), (2, 1));
        assert_eq!(run(&backend, &config, 250), (1, 1));
        assert_eq!(run(&backend, &config, 999), (1, 1));
        assert_eq!(run(&backend, &config, 1000), (0, 0));
    }

    #[test]
    fn normalized_is_the_input() {
        let backend = TransparentBackend::new();
        let who = Principal::new("alice").unwrap();
        let input = TransparentBackend::encrypt(INPUT_DOMAIN, 7, &who).unwrap();
        let sealed = backend.ingest(&input, &who).unwrap();
        let c = classify(&backend, sealed, &ThresholdConfig::default()).unwrap();
        assert_eq!(c.input, sealed);
        assert_eq!(c.normalized, sealed);
        assert_eq!(c.tier.domain(), TIER_DOMAIN);
        assert_eq!(c.win.domain(), SealedDomain::Bool);
    }

    #[test]
    fn only_tier_and_win_survive() {
        let backend = TransparentBackend::new();
        let who = Principal::new("alice").unwrap();
        let input = TransparentBackend::encrypt(INPUT_DOMAIN, 100, &who).unwrap();
        let sealed = backend.ingest(&input, &who).unwrap();
        let c = classify(&backend, sealed, &ThresholdConfig::default()).unwrap();
        assert_eq!(backend.len(), 3);
        assert_eq!(backend.reveal(&c.input).unwrap(), 100);
        assert_eq!(backend.reveal(&c.tier).unwrap(), 2);
        assert_eq!(backend.reveal(&c.win).unwrap(), 1);
    }

    #[test]
    fn invalid_config_issues_no_sealed_operations() {
        let backend = TransparentBackend::new();
        let sealed = backend.constant(INPUT_DOMAIN, 5).unwrap();
        let before = backend.len();
        let bad = ThresholdConfig {
            modulus: 10_000,
            jackpot_limit: 250,
            big_win_limit: 250,
            small_win_limit: 1000,
        };
        assert!(matches!(
            classify(&backend, sealed, &bad),
            Err(EngineError::ConfigurationInvalid(_))
        ));
        assert_eq!(backend.len(), before);
    }

    #[test]
    fn wrong_input_domain_is_rejected() {
        let backend = TransparentBackend::new();
        let sealed = backend.constant(SealedDomain::Uint32, 5).unwrap();
        assert!(matches!(
            classify(&backend, sealed, &ThresholdConfig::default()),
            Err(EngineError::Sealed(SealedError::DomainMismatch { .. }))
        ));
    }
}
