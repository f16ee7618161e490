//! # Error Hierarchy
//!
//! Validation errors for the core newtypes and the threshold configuration.
//! Built with `thiserror`; every variant carries the rejected input so an
//! operator can see what was wrong without re-running the request.

use thiserror::Error;

/// Validation errors for domain-primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Principal identifier is empty, too long, or contains forbidden characters.
    #[error("invalid principal: \"{0}\" (expected 1-128 characters from [A-Za-z0-9:._@-])")]
    InvalidPrincipal(String),

    /// Principal uses the prefix reserved for the engine itself.
    #[error("principal \"{0}\" uses the reserved \"cspin:\" prefix")]
    ReservedPrincipal(String),

    /// Handle is not a 32-byte hex string.
    #[error("invalid handle: \"{0}\" (expected 0x-prefixed 64 hex characters)")]
    InvalidHandle(String),

    /// Hex input could not be decoded.
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Violations of the threshold ordering invariant
/// `0 < jackpot_limit < big_win_limit < small_win_limit <= modulus`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Jackpot limit must be strictly positive.
    #[error("jackpot_limit must be greater than 0")]
    JackpotNotPositive,

    /// Jackpot limit must be strictly below the big-win limit.
    #[error("jackpot_limit ({jackpot}) must be less than big_win_limit ({big_win})")]
    JackpotNotBelowBigWin {
        /// Offending jackpot limit.
        jackpot: u32,
        /// Offending big-win limit.
        big_win: u32,
    },

    /// Big-win limit must be strictly below the small-win limit.
    #[error("big_win_limit ({big_win}) must be less than small_win_limit ({small_win})")]
    BigWinNotBelowSmallWin {
        /// Offending big-win limit.
        big_win: u32,
        /// Offending small-win limit.
        small_win: u32,
    },

    /// Small-win limit must not exceed the modulus.
    #[error("small_win_limit ({small_win}) must not exceed modulus ({modulus})")]
    SmallWinAboveModulus {
        /// Offending small-win limit.
        small_win: u32,
        /// Configured modulus.
        modulus: u32,
    },

    /// The modulus does not fit the sealed input domain.
    #[error("modulus ({modulus}) exceeds the sealed input domain maximum ({max})")]
    ModulusExceedsInputDomain {
        /// Configured modulus.
        modulus: u32,
        /// Largest permitted modulus.
        max: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_both_limits() {
        let err = ConfigError::BigWinNotBelowSmallWin {
            big_win: 1000,
            small_win: 250,
        };
        let msg = err.to_string();
        assert!(msg.contains("1000"));
        assert!(msg.contains("250"));
    }

    #[test]
    fn reserved_principal_message() {
        let err = ValidationError::ReservedPrincipal("cspin:engine".into());
        assert!(err.to_string().contains("reserved"));
    }
}
