//! Per-engine completion cache, keyed by scope fingerprint.
//!
//! The lifecycle of this cache is one engine instance, which is one
//! owner's edit session. It is never shared: a fingerprint identifies a
//! restriction scope, not a session, so a shared cache would leak one
//! owner's associations into another's view.

use super::CompletedSet;
use crate::scope::ScopeFingerprint;
use std::collections::BTreeMap;

static EMPTY: CompletedSet = CompletedSet::new();

///
/// CacheStats
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
}

///
/// CompletionCache
///

#[derive(Debug, Default)]
pub struct CompletionCache {
    entries: BTreeMap<ScopeFingerprint, CompletedSet>,
    hits: u64,
    misses: u64,
}

impl CompletionCache {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    #[must_use]
    pub fn contains(&self, fingerprint: &ScopeFingerprint) -> bool {
        self.entries.contains_key(fingerprint)
    }

    /// Store a completed set, replacing any previous entry for the scope.
    pub fn put(&mut self, fingerprint: ScopeFingerprint, set: CompletedSet) -> &CompletedSet {
        let slot = self.entries.entry(fingerprint).or_default();
        *slot = set;
        slot
    }

    /// Borrow the entry for a fingerprint.
    /// Invariant: callers insert before viewing; an unknown fingerprint
    /// views the empty set.
    #[must_use]
    pub fn view(&self, fingerprint: &ScopeFingerprint) -> &CompletedSet {
        self.entries.get(fingerprint).unwrap_or(&EMPTY)
    }

    pub const fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub const fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Drop every completed set. Hit/miss counters survive; they describe
    /// the session, not the current entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            size: self.entries.len(),
        }
    }
}
