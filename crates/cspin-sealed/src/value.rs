//! # Sealed Value Types
//!
//! Handles and domain tags. Nothing in this module can produce a plaintext.

use cspin_core::{hex_decode, hex_encode, HandleId, ValidationError};
use serde::{Deserialize, Serialize};

/// Plaintext domain of a sealed scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SealedDomain {
    /// Sealed boolean.
    Bool,
    /// Sealed 8-bit unsigned integer.
    Uint8,
    /// Sealed 16-bit unsigned integer.
    Uint16,
    /// Sealed 32-bit unsigned integer.
    Uint32,
}

impl SealedDomain {
    /// Largest representable plaintext.
    pub fn max_value(&self) -> u64 {
        match self {
            Self::Bool => 1,
            Self::Uint8 => u8::MAX as u64,
            Self::Uint16 => u16::MAX as u64,
            Self::Uint32 => u32::MAX as u64,
        }
    }

    /// Ciphertext width in bytes for the transparent encoding.
    pub fn byte_width(&self) -> usize {
        match self {
            Self::Bool | Self::Uint8 => 1,
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }

    /// Whether values of this domain are integers.
    pub fn is_integer(&self) -> bool {
        !matches!(self, Self::Bool)
    }

    /// One-byte tag mixed into handle and proof derivation.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Uint8 => 8,
            Self::Uint16 => 16,
            Self::Uint32 => 32,
        }
    }

    /// Lowercase name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
        }
    }
}

impl std::fmt::Display for SealedDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque handle to an encrypted scalar.
///
/// Holding a `SealedValue` confers no right to decrypt it; decrypt rights
/// are recorded separately per handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SealedValue {
    handle: HandleId,
    domain: SealedDomain,
}

impl SealedValue {
    /// Pair a handle with its domain. Only backends and persistence
    /// hydration should call this.
    pub fn from_parts(handle: HandleId, domain: SealedDomain) -> Self {
        Self { handle, domain }
    }

    /// The ciphertext handle.
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// The plaintext domain.
    pub fn domain(&self) -> SealedDomain {
        self.domain
    }
}

/// Sealed boolean produced by a comparison and consumed by `select`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SealedPredicate(SealedValue);

impl SealedPredicate {
    /// Wrap a sealed boolean. Backends only.
    pub(crate) fn new(value: SealedValue) -> Self {
        Self(value)
    }

    /// View the predicate as a storable sealed boolean.
    pub fn as_value(&self) -> SealedValue {
        self.0
    }
}

/// Externally encrypted input together with its proof of well-formedness,
/// as submitted by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    /// Domain the ciphertext claims to encode.
    pub domain: SealedDomain,
    /// Ciphertext bytes.
    pub ciphertext: Vec<u8>,
    /// Input proof bytes.
    pub proof: Vec<u8>,
}

impl EncryptedInput {
    /// Build from hex-encoded ciphertext and proof, as received on the wire.
    pub fn from_hex(
        domain: SealedDomain,
        ciphertext_hex: &str,
        proof_hex: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            domain,
            ciphertext: hex_decode(ciphertext_hex)?,
            proof: hex_decode(proof_hex)?,
        })
    }

    /// Hex-encoded ciphertext.
    pub fn ciphertext_hex(&self) -> String {
        format!("0x{}", hex_encode(&self.ciphertext))
    }

    /// Hex-encoded proof.
    pub fn proof_hex(&self) -> String {
        format!("0x{}", hex_encode(&self.proof))
    }
}
