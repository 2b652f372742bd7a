//! The relation completion & synchronization engine.
//!
//! One engine instance serves one owner's edit session: it completes the
//! counterpart → association mapping (persisted rows plus synthesized
//! placeholders), merges inbound payloads into a dirty subset, and
//! validates/saves only that subset with exhaustive error aggregation.

mod accessor;
mod cache;
mod policy;

#[cfg(test)]
mod tests;

pub use accessor::InterpretationAccessor;
pub use cache::{CacheStats, CompletionCache};
pub use policy::{PresenceMode, TranslationPolicy};

use crate::{
    error::{ConfigError, SyncError},
    key::Key,
    model::{AssociationRecord, Owner, RelationConfig, RelationSpec},
    obs::{SyncTraceEvent, SyncTraceSink},
    payload::Payload,
    scope::{RestrictionScope, ScopeFingerprint},
    store::AssociationStore,
    value::{AttrBag, Value},
};
use std::collections::BTreeMap;

/// Ordered counterpart key → association record mapping. `BTreeMap` keyed
/// by [`Key`] carries the ordering invariant: iteration, display, and save
/// order are always counterpart-key ascending.
pub type CompletedSet = BTreeMap<Key, AssociationRecord>;

///
/// RelationCompletionEngine
///
/// Exclusively owned by the code path handling one owner's edit session.
/// Borrowing the owner and store mutably for the engine's lifetime makes
/// that exclusivity a compile-time property.
///

pub struct RelationCompletionEngine<'a, S: AssociationStore> {
    owner: &'a mut Owner,
    store: &'a mut S,
    config: RelationConfig,
    scope: RestrictionScope,
    policy: Option<TranslationPolicy>,
    cache_enabled: bool,
    cache: CompletionCache,
    dirty: CompletedSet,
    trace: Option<&'a dyn SyncTraceSink>,
}

impl<S: AssociationStore> std::fmt::Debug for RelationCompletionEngine<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationCompletionEngine")
            .field("config", &self.config)
            .field("scope", &self.scope)
            .field("policy", &self.policy)
            .field("cache_enabled", &self.cache_enabled)
            .field("cache", &self.cache)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl<'a, S: AssociationStore> RelationCompletionEngine<'a, S> {
    /// Construct an engine for one owner edit session. Fails when the
    /// relation spec is missing the junction type or either role key.
    pub fn new(owner: &'a mut Owner, store: &'a mut S, spec: RelationSpec) -> Result<Self, ConfigError> {
        let config = RelationConfig::try_from(spec)?;

        Ok(Self {
            owner,
            store,
            config,
            scope: RestrictionScope::unrestricted(),
            policy: None,
            cache_enabled: true,
            cache: CompletionCache::new(),
            dirty: CompletedSet::new(),
            trace: None,
        })
    }

    #[must_use]
    pub fn with_scope(mut self, scope: RestrictionScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: TranslationPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    #[must_use]
    pub const fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn with_trace_sink(mut self, sink: &'a dyn SyncTraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Switch the current restriction scope mid-session. Completed sets
    /// for other scopes stay cached; they recompute only when the cache
    /// was cleared by a merge.
    pub fn set_scope(&mut self, scope: RestrictionScope) {
        self.scope = scope;
    }

    #[must_use]
    pub const fn config(&self) -> &RelationConfig {
        &self.config
    }

    #[must_use]
    pub fn owner(&self) -> &Owner {
        &*self.owner
    }

    /// The owner handle, for recording the persisted key mid-session and
    /// inspecting aggregated errors.
    pub fn owner_mut(&mut self) -> &mut Owner {
        &mut *self.owner
    }

    /// The subset touched by the most recent payload merge; the only rows
    /// `validate()` and `save()` operate on.
    #[must_use]
    pub const fn dirty(&self) -> &CompletedSet {
        &self.dirty
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // ── Read path ─────────────────────────────────────

    /// Materialized associations for the current scope: persisted rows
    /// restricted by the scope's key set, shadowed by dirty rows. A dirty
    /// in-memory edit always wins over a stale store read.
    #[must_use]
    pub fn associations(&self) -> CompletedSet {
        self.associations_for(&self.scope)
    }

    /// The complete counterpart → association mapping for the current
    /// scope: one entry per scope-matching counterpart, persisted or
    /// synthesized, ascending by counterpart key. Cached per scope
    /// fingerprint; with caching disabled every call recomputes.
    pub fn all_associations(&mut self) -> &CompletedSet {
        let fingerprint = self.scope.fingerprint();

        if self.cache_enabled && self.cache.contains(&fingerprint) {
            self.cache.record_hit();
            self.emit(SyncTraceEvent::CacheHit { fingerprint });
        } else {
            self.cache.record_miss();
            self.emit(SyncTraceEvent::CacheMiss { fingerprint });
            let set = self.completed_for(&self.scope, fingerprint);
            self.cache.put(fingerprint, set);
        }

        self.cache.view(&fingerprint)
    }

    /// The association pointed to by the owner's configured current
    /// pointer attribute, if the pointer is configured, set, and resolves
    /// to a materialized row.
    #[must_use]
    pub fn current_association(&self) -> Option<AssociationRecord> {
        let pointer = self.config.current_pointer()?;
        let key = self.owner.attrs().get(pointer)?.as_key()?;

        self.associations().remove(&key)
    }

    /// Attribute of the current association.
    #[must_use]
    pub fn interpret(&self, field: &str) -> Option<Value> {
        self.current_association()?.get(field).cloned()
    }

    /// Attribute of the materialized association for one counterpart.
    /// Looks at materialized rows only, never at synthesized placeholders.
    #[must_use]
    pub fn interpret_at(&self, field: &str, counterpart_key: &Key) -> Option<Value> {
        let set = self.associations();

        set.get(counterpart_key)
            .and_then(|rec| rec.get(field))
            .cloned()
    }

    /// Read façade over this engine.
    pub fn accessor(&mut self) -> InterpretationAccessor<'_, 'a, S> {
        InterpretationAccessor::new(self)
    }

    // ── Write path ────────────────────────────────────

    /// Merge an inbound payload into the dirty set. Only counterpart keys
    /// present under this relation's junction namespace are touched; a
    /// payload with no rows for this relation is a no-op. Replaces the
    /// dirty set with the restricted, updated subset.
    pub fn set_associations(&mut self, payload: &Payload) -> &mut Self {
        let Some(rows) = payload.rows_for(self.config.junction()) else {
            return self;
        };
        if rows.is_empty() {
            return self;
        }

        let scope = self.scope.narrowed_to(rows.keys().cloned());
        let fingerprint = scope.fingerprint();
        let mut base = self.completed_for(&scope, fingerprint);

        let seen = rows.len() as u64;
        let mut accepted = CompletedSet::new();
        let excluded = [self.config.primary_role().as_str()];

        for (key, attrs) in rows {
            // Keys outside the candidate set name no counterpart; skip.
            let Some(mut rec) = base.remove(key) else {
                continue;
            };

            rec.assign(attrs);
            // Row identity comes from map position; write the key back
            // onto rows that did not carry it.
            if rec.get(self.config.secondary_role()).is_none() {
                rec.set(self.config.secondary_role().clone(), Value::from(key));
            }

            let keep = self
                .policy
                .as_ref()
                .is_none_or(|policy| policy.accepts(&rec, &*self.store, &excluded));
            if keep {
                accepted.insert(key.clone(), rec);
            }
        }

        self.emit(SyncTraceEvent::Merged {
            rows: seen,
            accepted: accepted.len() as u64,
        });
        self.dirty = accepted;
        // Completed views must reflect dirty shadows from now on.
        self.cache.clear();

        self
    }

    /// Force the dirty set to the full completed mapping and apply one
    /// attribute bag uniformly onto every member.
    pub fn set_all_associations(&mut self, attrs: &AttrBag) -> &mut Self {
        let fingerprint = self.scope.fingerprint();
        let mut set = self.completed_for(&self.scope, fingerprint);

        for rec in set.values_mut() {
            rec.assign(attrs);
        }

        self.emit(SyncTraceEvent::Merged {
            rows: set.len() as u64,
            accepted: set.len() as u64,
        });
        self.dirty = set;
        self.cache.clear();

        self
    }

    /// Validate the dirty set, aggregating every field error onto the
    /// owner. Exhaustive: all members are validated so the error surface
    /// is complete, not just the first failure. An empty dirty set is
    /// trivially valid.
    pub fn validate(&mut self) -> bool {
        let mut ok = true;

        if let Some(policy) = self.policy.clone()
            && self.owner.is_new()
        {
            ok &= self.apply_presence_rule(&policy);
        }

        // A not-null owner reference must not fail before the owner itself
        // is persisted: assign the sentinel and exclude the role field.
        let owner_key = self
            .owner
            .key()
            .cloned()
            .unwrap_or_else(Key::unassigned);
        let excluded = [self.config.primary_role().as_str()];

        let mut failed = 0u64;
        let total = self.dirty.len() as u64;
        for rec in self.dirty.values_mut() {
            rec.set_owner_key(owner_key.clone());

            if let Err(errors) = self.store.validate(rec, &excluded) {
                self.owner.errors_mut().absorb(errors);
                failed += 1;
                ok = false;
            }
        }

        self.emit(SyncTraceEvent::Validated { total, failed });

        ok
    }

    /// Persist the dirty set in deterministic order. The owner must have
    /// been persisted by the caller first. Best-effort and
    /// non-transactional: one member's failure never halts the loop, so a
    /// failed batch can be partially persisted; failures aggregate onto
    /// the owner and the aggregate result is `Ok(false)`.
    pub fn save(&mut self) -> Result<bool, SyncError> {
        let owner_key = self.owner.key().cloned().ok_or(SyncError::OwnerUnsaved)?;

        let mut ok = true;
        let mut failed = 0u64;
        let total = self.dirty.len() as u64;

        for rec in self.dirty.values_mut() {
            rec.set_owner_key(owner_key.clone());

            match self.store.save(rec) {
                Ok(_) => rec.mark_saved(),
                Err(errors) => {
                    self.owner.errors_mut().absorb(errors);
                    failed += 1;
                    ok = false;
                }
            }
        }

        self.emit(SyncTraceEvent::SavedBatch { total, failed });

        Ok(ok)
    }

    // ── Internals ─────────────────────────────────────

    /// Materialized rows for a scope: store query (minus keys shadowed by
    /// the dirty set) unioned with the scope-matching dirty rows.
    fn associations_for(&self, scope: &RestrictionScope) -> CompletedSet {
        let owner_key = self
            .owner
            .key()
            .cloned()
            .unwrap_or_else(Key::unassigned);

        let mut set = CompletedSet::new();
        for rec in self.store.find_associations(&owner_key, scope.key_set()) {
            if self.dirty.contains_key(rec.counterpart_key()) {
                continue;
            }
            set.insert(rec.counterpart_key().clone(), rec);
        }

        for (key, rec) in &self.dirty {
            if scope.admits_key(key) {
                set.insert(key.clone(), rec.clone());
            }
        }

        set
    }

    /// Complete a scope: exactly one entry per scope-matching counterpart,
    /// materialized rows first, synthesized placeholders for the gaps.
    fn completed_for(&self, scope: &RestrictionScope, fingerprint: ScopeFingerprint) -> CompletedSet {
        let owner_key = self
            .owner
            .key()
            .cloned()
            .unwrap_or_else(Key::unassigned);

        let mut materialized = self.associations_for(scope);
        let mut set = CompletedSet::new();
        let mut synthesized = 0u64;

        for entity in self.store.find_counterparts(scope.filter()) {
            if !scope.admits_key(entity.key()) {
                continue;
            }

            let rec = materialized.remove(entity.key()).unwrap_or_else(|| {
                synthesized += 1;
                self.store
                    .create_association(owner_key.clone(), entity.key().clone())
            });
            set.insert(entity.key().clone(), rec);
        }

        self.emit(SyncTraceEvent::Completed {
            fingerprint,
            persisted: set.len() as u64 - synthesized,
            synthesized,
        });

        set
    }

    /// Presence rule for new owners: a policy demands at least one kept
    /// translation (partial) or flags the incomplete set (full). In
    /// partial mode the earliest-keyed kept candidate becomes the default.
    fn apply_presence_rule(&mut self, policy: &TranslationPolicy) -> bool {
        let excluded = [self.config.primary_role().as_str()];
        let kept: Vec<Key> = self
            .dirty
            .iter()
            .filter(|(_, rec)| policy.accepts(rec, &*self.store, &excluded))
            .map(|(key, _)| key.clone())
            .collect();

        if kept.is_empty() {
            let field = self.config.junction().clone();
            self.owner.errors_mut().add(field, policy.presence_error());
            return false;
        }

        if matches!(policy.mode(), PresenceMode::Partial)
            && let Some(first) = kept.first()
            && let Some(rec) = self.dirty.get_mut(first)
        {
            rec.set(policy.default_flag().clone(), true);
        }

        true
    }

    fn emit(&self, event: SyncTraceEvent) {
        if let Some(sink) = self.trace {
            sink.on_event(event);
        }
    }
}
