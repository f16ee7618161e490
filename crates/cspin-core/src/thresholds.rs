//! # Threshold Configuration
//!
//! The three clear-text cutoffs and the modulus that define tier boundaries.
//!
//! ## Invariant
//!
//! `0 < jackpot_limit < big_win_limit < small_win_limit <= modulus`, and the
//! modulus must fit the sealed input domain. [`ThresholdConfig::validate`] is
//! the single check; stores call it on every write and the engine calls it
//! again on the snapshot it classifies against.
//!
//! ## Tier Partition
//!
//! For plaintext `p`:
//!
//! | range                                   | tier |
//! |-----------------------------------------|------|
//! | `p < jackpot_limit`                     | 3    |
//! | `jackpot_limit <= p < big_win_limit`    | 2    |
//! | `big_win_limit <= p < small_win_limit`  | 1    |
//! | `p >= small_win_limit`                  | 0    |

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest permitted modulus.
///
/// Inputs are sealed 16-bit integers and every limit is lifted into that
/// same domain for comparison, so no limit may exceed `u16::MAX`.
pub const MAX_MODULUS: u32 = u16::MAX as u32;

/// Owner-configured classification thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Exclusive upper bound of the input range the caller samples from.
    pub modulus: u32,
    /// Inputs below this are tier 3.
    pub jackpot_limit: u32,
    /// Inputs below this (and at or above the jackpot limit) are tier 2.
    pub big_win_limit: u32,
    /// Inputs below this (and at or above the big-win limit) are tier 1.
    pub small_win_limit: u32,
}

impl ThresholdConfig {
    /// Build and validate a configuration.
    pub fn new(
        modulus: u32,
        jackpot_limit: u32,
        big_win_limit: u32,
        small_win_limit: u32,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            modulus,
            jackpot_limit,
            big_win_limit,
            small_win_limit,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the three limits, keeping the modulus. Validates the result.
    pub fn with_limits(
        &self,
        small_win_limit: u32,
        big_win_limit: u32,
        jackpot_limit: u32,
    ) -> Result<Self, ConfigError> {
        Self::new(self.modulus, jackpot_limit, big_win_limit, small_win_limit)
    }

    /// Check the ordering invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jackpot_limit == 0 {
            return Err(ConfigError::JackpotNotPositive);
        }
        if self.jackpot_limit >= self.big_win_limit {
            return Err(ConfigError::JackpotNotBelowBigWin {
                jackpot: self.jackpot_limit,
                big_win: self.big_win_limit,
            });
        }
        if self.big_win_limit >= self.small_win_limit {
            return Err(ConfigError::BigWinNotBelowSmallWin {
                big_win: self.big_win_limit,
                small_win: self.small_win_limit,
            });
        }
        if self.small_win_limit > self.modulus {
            return Err(ConfigError::SmallWinAboveModulus {
                small_win: self.small_win_limit,
                modulus: self.modulus,
            });
        }
        if self.modulus > MAX_MODULUS {
            return Err(ConfigError::ModulusExceedsInputDomain {
                modulus: self.modulus,
                max: MAX_MODULUS,
            });
        }
        Ok(())
    }

    /// Plaintext tier for `p` under this configuration.
    ///
    /// Reference partition for tests and tooling. The engine never calls
    /// this: it only ever sees sealed inputs.
    pub fn reference_tier(&self, p: u32) -> u8 {
        if p < self.jackpot_limit {
            3
        } else if p < self.big_win_limit {
            2
        } else if p < self.small_win_limit {
            1
        } else {
            0
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            modulus: 10_000,
            jackpot_limit: 50,
            big_win_limit: 250,
            small_win_limit: 1_000,
        }
    }
}
