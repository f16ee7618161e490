//! # Capability Ledger
//!
//! Append-only relation recording which principals may request the
//! plaintext of which sealed handle, plus a one-way public flag.
//!
//! A principal is authorized for a handle iff it holds an explicit grant
//! or the handle is publicly readable. Neither can be undone: there is no
//! revoke, and [`CapabilityLedger::reveal_to_everyone`] has no inverse.

use std::collections::HashMap;

use cspin_core::{HandleId, Principal, Timestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// One `(handle, principal)` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityGrant {
    /// The sealed value.
    pub handle: HandleId,
    /// The principal allowed to decrypt it.
    pub principal: Principal,
    /// When the grant was first recorded.
    pub granted_at: Timestamp,
}

/// A handle that was made publicly readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicReveal {
    /// The sealed value.
    pub handle: HandleId,
    /// When it became publicly readable.
    pub revealed_at: Timestamp,
}

#[derive(Debug, Default)]
struct LedgerInner {
    grants: HashMap<HandleId, HashMap<Principal, Timestamp>>,
    public: HashMap<HandleId, Timestamp>,
}

/// The decrypt-capability relation.
#[derive(Debug, Default)]
pub struct CapabilityLedger {
    inner: RwLock<LedgerInner>,
}

impl CapabilityLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch of grants under one write lock.
    ///
    /// Returns the grants that were newly recorded. A pair that already
    /// exists keeps its original `granted_at`.
    pub fn grant_all(&self, grants: &[CapabilityGrant]) -> Vec<CapabilityGrant> {
        let mut inner = self.inner.write();
        grants
            .iter()
            .filter(|g| Self::insert(&mut inner, g.handle, &g.principal, g.granted_at))
            .cloned()
            .collect()
    }

    /// Whether `principal` may decrypt `handle`.
    pub fn is_authorized(&self, handle: &HandleId, principal: &Principal) -> bool {
        let inner = self.inner.read();
        inner.public.contains_key(handle)
            || inner
                .grants
                .get(handle)
                .is_some_and(|holders| holders.contains_key(principal))
    }

    /// Make `reveal.handle` decryptable by anyone.
    ///
    /// Idempotent. Returns `true` if this call set the flag; an existing
    /// flag keeps its original `revealed_at`.
    pub fn reveal_to_everyone(&self, reveal: PublicReveal) -> bool {
        let mut inner = self.inner.write();
        if inner.public.contains_key(&reveal.handle) {
            return false;
        }
        inner.public.insert(reveal.handle, reveal.revealed_at);
        true
    }

    /// Whether `handle` has been made publicly readable.
    pub fn is_publicly_readable(&self, handle: &HandleId) -> bool {
        self.inner.read().public.contains_key(handle)
    }

    /// When `handle` became publicly readable, if it has.
    pub fn revealed_at(&self, handle: &HandleId) -> Option<Timestamp> {
        self.inner.read().public.get(handle).copied()
    }

    /// Explicit grants on `handle`, ordered by principal.
    pub fn grants_for(&self, handle: &HandleId) -> Vec<CapabilityGrant> {
        let inner = self.inner.read();
        let mut grants: Vec<CapabilityGrant> = inner
            .grants
            .get(handle)
            .map(|holders| {
                holders
                    .iter()
                    .map(|(principal, granted_at)| CapabilityGrant {
                        handle: *handle,
                        principal: principal.clone(),
                        granted_at: *granted_at,
                    })
                    .collect()
            })
            .unwrap_or_default();
        grants.sort_by(|a, b| a.principal.cmp(&b.principal));
        grants
    }

    /// Total number of explicit grants.
    pub fn grant_count(&self) -> usize {
        self.inner.read().grants.values().map(HashMap::len).sum()
    }

    /// Number of publicly readable handles.
    pub fn public_count(&self) -> usize {
        self.inner.read().public.len()
    }

    fn insert(inner: &mut LedgerInner, handle: HandleId, principal: &Principal, at: Timestamp) -> bool {
        let holders = inner.grants.entry(handle).or_default();
        if holders.contains_key(principal) {
            return false;
        }
        holders.insert(principal.clone(), at);
        true
    }
}
