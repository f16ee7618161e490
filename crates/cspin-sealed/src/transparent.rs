//! # Transparent Backend
//!
//! A plaintext stand-in for the confidential computation library. Values
//! are kept in a handle-keyed table; handles are SHA-256 digests of a
//! per-instance salt and a counter, so they reveal nothing about the value
//! they point at.
//!
//! Input proofs are `SHA-256("cspin-input-proof" || submitter || 0x00 ||
//! domain tag || ciphertext)`. The submitter is bound into the proof, so a
//! proof generated for one principal does not verify for another.
//!
//! ## Security Notice
//!
//! This backend provides NO confidentiality. Anyone with access to the
//! process can call [`TransparentBackend::reveal`]. It exists so that the
//! engine and the HTTP surface run end to end, and so that tests can assert
//! tier and win outputs directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use cspin_core::{sha256_bytes, HandleId, Principal};
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;

use crate::traits::{check_comparable, check_selectable, SealedArithmetic, SealedError};
use crate::value::{EncryptedInput, SealedDomain, SealedPredicate, SealedValue};

const HANDLE_DOMAIN: &[u8] = b"cspin-handle";
const PROOF_DOMAIN: &[u8] = b"cspin-input-proof";
const PROOF_LEN: usize = 32;

/// Plaintext-backed implementation of [`SealedArithmetic`].
pub struct TransparentBackend {
    salt: [u8; 32],
    counter: AtomicU64,
    values: RwLock<HashMap<HandleId, (SealedDomain, u64)>>,
}

impl std::fmt::Debug for TransparentBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransparentBackend")
            .field("values", &self.values.read().len())
            .finish_non_exhaustive()
    }
}

impl Default for TransparentBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TransparentBackend {
    /// Create a backend with a random handle salt.
    pub fn new() -> Self {
        let mut salt = [0u8; 32];
        OsRng.fill_bytes(&mut salt);
        Self::with_salt(salt)
    }

    /// Create a backend with a fixed handle salt. Handle sequences are
    /// reproducible across instances with the same salt.
    pub fn with_salt(salt: [u8; 32]) -> Self {
        Self {
            salt,
            counter: AtomicU64::new(0),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Encrypt `value` for `submitter` and produce a matching input proof.
    ///
    /// Client-side helper: a real deployment performs this step in the
    /// caller's wallet, not on the server.
    pub fn encrypt(
        domain: SealedDomain,
        value: u64,
        submitter: &Principal,
    ) -> Result<EncryptedInput, SealedError> {
        if value > domain.max_value() {
            return Err(SealedError::ValueOutOfRange { value, domain });
        }
        let width = domain.byte_width();
        let ciphertext = value.to_be_bytes()[8 - width..].to_vec();
        let proof = input_proof(domain, &ciphertext, submitter).to_vec();
        Ok(EncryptedInput {
            domain,
            ciphertext,
            proof,
        })
    }

    /// Plaintext behind `value`. Development and test use only.
    pub fn reveal(&self, value: &SealedValue) -> Result<u64, SealedError> {
        self.load(value)
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    /// Whether the backend holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    fn store(&self, domain: SealedDomain, clear: u64) -> SealedValue {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let handle = HandleId::from_bytes(sha256_bytes(&[
            HANDLE_DOMAIN,
            &self.salt,
            &n.to_be_bytes(),
            &[domain.tag()],
        ]));
        self.values.write().insert(handle, (domain, clear));
        SealedValue::from_parts(handle, domain)
    }

    fn load(&self, value: &SealedValue) -> Result<u64, SealedError> {
        let (domain, clear) = self
            .values
            .read()
            .get(&value.handle())
            .copied()
            .ok_or(SealedError::UnknownHandle(value.handle()))?;
        if domain != value.domain() {
            return Err(SealedError::DomainMismatch {
                operation: "load",
                expected: domain,
                actual: value.domain(),
            });
        }
        Ok(clear)
    }

    fn predicate(&self, holds: bool) -> SealedPredicate {
        SealedPredicate::new(self.store(SealedDomain::Bool, u64::from(holds)))
    }
}

fn input_proof(domain: SealedDomain, ciphertext: &[u8], submitter: &Principal) -> [u8; 32] {
    sha256_bytes(&[
        PROOF_DOMAIN,
        submitter.as_str().as_bytes(),
        &[0u8],
        &[domain.tag()],
        ciphertext,
    ])
}

impl SealedArithmetic for TransparentBackend {
    fn backend_name(&self) -> &'static str {
        "transparent"
    }

    fn ingest(
        &self,
        input: &EncryptedInput,
        submitter: &Principal,
    ) -> Result<SealedValue, SealedError> {
        if input.proof.is_empty() {
            return Err(SealedError::InvalidProof("proof is empty".into()));
        }
        if input.proof.len() != PROOF_LEN {
            return Err(SealedError::InvalidProof(format!(
                "proof must be {PROOF_LEN} bytes, got {}",
                input.proof.len()
            )));
        }
        let width = input.domain.byte_width();
        if input.ciphertext.len() != width {
            return Err(SealedError::InvalidProof(format!(
                "ciphertext for {} must be {width} bytes, got {}",
                input.domain,
                input.ciphertext.len()
            )));
        }
        let expected = input_proof(input.domain, &input.ciphertext, submitter);
        if !bool::from(expected.as_slice().ct_eq(input.proof.as_slice())) {
            tracing::debug!(submitter = %submitter, domain = %input.domain, "input proof mismatch");
            return Err(SealedError::InvalidProof(
                "proof does not verify for this submitter".into(),
            ));
        }

        let mut buf = [0u8; 8];
        buf[8 - width..].copy_from_slice(&input.ciphertext);
        let clear = u64::from_be_bytes(buf);
        if clear > input.domain.max_value() {
            return Err(SealedError::InvalidProof(format!(
                "ciphertext does not decode in {}",
                input.domain
            )));
        }
        Ok(self.store(input.domain, clear))
    }

    fn constant(&self, domain: SealedDomain, clear: u64) -> Result<SealedValue, SealedError> {
        if clear > domain.max_value() {
            return Err(SealedError::ValueOutOfRange {
                value: clear,
                domain,
            });
        }
        Ok(self.store(domain, clear))
    }

    fn less_than(&self, a: &SealedValue, b: &SealedValue) -> Result<SealedPredicate, SealedError> {
        check_comparable("less_than", a, b)?;
        let (x, y) = (self.load(a)?, self.load(b)?);
        Ok(self.predicate(x < y))
    }

    fn greater_than(
        &self,
        a: &SealedValue,
        b: &SealedValue,
    ) -> Result<SealedPredicate, SealedError> {
        check_comparable("greater_than", a, b)?;
        let (x, y) = (self.load(a)?, self.load(b)?);
        Ok(self.predicate(x > y))
    }

    fn select(
        &self,
        predicate: &SealedPredicate,
        if_true: &SealedValue,
        if_false: &SealedValue,
    ) -> Result<SealedValue, SealedError> {
        check_selectable(if_true, if_false)?;
        let cond = self.load(&predicate.as_value())?;
        let (t, f) = (self.load(if_true)?, self.load(if_false)?);
        // Both branches are loaded before picking, matching the data flow of
        // a real sealed select.
        let picked = if cond != 0 { t } else { f };
        Ok(self.store(if_true.domain(), picked))
    }

    fn discard(&self, value: &SealedValue) {
        self.values.write().remove(&value.handle());
    }
}
