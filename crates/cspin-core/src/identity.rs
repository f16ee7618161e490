//! # Identity Newtypes
//!
//! [`Principal`] names an actor that may request classifications, hold
//! decrypt capabilities, or administer thresholds. [`HandleId`] names one
//! stored ciphertext. Each is a distinct type; a handle can never be passed
//! where a principal is expected.
//!
//! ## Reserved Principal
//!
//! The engine holds decrypt capabilities on every value it produces. It is
//! represented by [`ENGINE_PRINCIPAL`], whose `cspin:` prefix is rejected by
//! [`Principal::new`], so no external caller can claim the engine's grants.

use serde::{Deserialize, Serialize};

use crate::digest::{hex_decode, hex_encode};
use crate::error::ValidationError;

/// The principal under which the engine holds its own capabilities.
pub const ENGINE_PRINCIPAL: &str = "cspin:engine";

const RESERVED_PREFIX: &str = "cspin:";
const MAX_PRINCIPAL_LEN: usize = 128;

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An actor identity (wallet address, account name, service id).
///
/// 1-128 characters from `[A-Za-z0-9:._@-]`. Case is preserved and
/// significant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Create a principal from caller-supplied input.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPrincipal`] on malformed input and
    /// [`ValidationError::ReservedPrincipal`] for the `cspin:` namespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate_format(&s)?;
        if s.starts_with(RESERVED_PREFIX) {
            return Err(ValidationError::ReservedPrincipal(s));
        }
        Ok(Self(s))
    }

    /// The engine's own principal.
    pub fn engine() -> Self {
        Self(ENGINE_PRINCIPAL.to_string())
    }

    /// Whether this is the engine's own principal.
    pub fn is_engine(&self) -> bool {
        self.0 == ENGINE_PRINCIPAL
    }

    /// Access the principal string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate_format(s: &str) -> Result<(), ValidationError> {
        let valid = !s.is_empty()
            && s.len() <= MAX_PRINCIPAL_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '@' | '-'));
        if valid {
            Ok(())
        } else {
            Err(ValidationError::InvalidPrincipal(s.to_string()))
        }
    }
}

impl TryFrom<String> for Principal {
    type Error = ValidationError;

    /// Deserialization path. Accepts the engine principal so persisted
    /// grants round-trip; external input goes through [`Principal::new`].
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s == ENGINE_PRINCIPAL {
            return Ok(Self::engine());
        }
        Self::new(s)
    }
}

impl From<Principal> for String {
    fn from(p: Principal) -> Self {
        p.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// HandleId
// ---------------------------------------------------------------------------

/// Opaque 32-byte identifier of a stored ciphertext.
///
/// Displays and serializes as `0x` followed by 64 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandleId([u8; 32]);

impl HandleId {
    /// Wrap raw handle bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Access the raw handle bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a `0x`-prefixed (or bare) 64-character hex handle.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let hex = s.strip_prefix("0x").unwrap_or(s);
        if hex.len() != 64 {
            return Err(ValidationError::InvalidHandle(s.to_string()));
        }
        let bytes = hex_decode(hex).map_err(|_| ValidationError::InvalidHandle(s.to_string()))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Return the `0x`-prefixed hex form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex_encode(&self.0))
    }
}

impl std::str::FromStr for HandleId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HandleId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<HandleId> for String {
    fn from(h: HandleId) -> Self {
        h.to_hex()
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_accepts_address_like_strings() {
        assert!(Principal::new("0x52908400098527886E0F7030069857D2E4169EE7").is_ok());
        assert!(Principal::new("alice@example.org").is_ok());
        assert!(Principal::new("team:ops.bot_1").is_ok());
    }

    #[test]
    fn principal_rejects_empty_and_whitespace() {
        assert!(matches!(
            Principal::new(""),
            Err(ValidationError::InvalidPrincipal(_))
        ));
        assert!(matches!(
            Principal::new("has space"),
            Err(ValidationError::InvalidPrincipal(_))
        ));
    }

    #[test]
    fn principal_rejects_overlong() {
        let long = "a".repeat(129);
        assert!(Principal::new(long).is_err());
        assert!(Principal::new("a".repeat(128)).is_ok());
    }

    #[test]
    fn principal_rejects_reserved_prefix() {
        assert!(matches!(
            Principal::new("cspin:engine"),
            Err(ValidationError::ReservedPrincipal(_))
        ));
        assert!(matches!(
            Principal::new("cspin:anything"),
            Err(ValidationError::ReservedPrincipal(_))
        ));
    }

    #[test]
    fn engine_principal_roundtrips_through_serde() {
        let engine = Principal::engine();
        assert!(engine.is_engine());
        let json = serde_json::to_string(&engine).unwrap();
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, engine);
    }

    #[test]
    fn principal_deserialize_validates() {
        let bad: Result<Principal, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
        let reserved: Result<Principal, _> = serde_json::from_str("\"cspin:other\"");
        assert!(reserved.is_err());
    }

    #[test]
    fn handle_hex_form_is_prefixed() {
        let h = HandleId::from_bytes([0xab; 32]);
        let s = h.to_hex();
        assert!(s.starts_with("0x"));
        assert_eq!(s.len(), 66);
        assert_eq!(HandleId::parse(&s).unwrap(), h);
    }

    #[test]
    fn handle_parse_accepts_bare_hex() {
        let bare = "11".repeat(32);
        assert_eq!(
            HandleId::parse(&bare).unwrap(),
            HandleId::from_bytes([0x11; 32])
        );
    }

    #[test]
    fn handle_parse_rejects_bad_input() {
        assert!(HandleId::parse("0x1234").is_err());
        assert!(HandleId::parse(&format!("0x{}", "zz".repeat(32))).is_err());
    }

    #[test]
    fn handle_serializes_as_hex_string() {
        let h = HandleId::from_bytes([1; 32]);
        let json = serde_json::to_value(h).unwrap();
        assert_eq!(json, serde_json::json!(h.to_hex()));
    }
}
