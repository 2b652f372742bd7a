//! The store boundary: the adapter contract the engine consumes, plus the
//! BTreeMap-backed reference implementation.

mod memory;

pub use memory::{FieldRule, MemoryAssociationStore};

use crate::{
    key::Key,
    model::AssociationRecord,
    scope::FilterExpr,
    value::{AttrBag, Value},
};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

///
/// FieldErrors
///
/// Field-level validation/persistence errors reported by a store. Carried
/// as data, never thrown; the engine aggregates them onto the owner.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, IntoIterator, PartialEq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    #[must_use]
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

///
/// CounterpartEntity
///
/// A candidate entity on the "many" side of the relation. The full set,
/// filtered by the restriction scope, bounds how many association rows can
/// exist for one owner.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CounterpartEntity {
    key: Key,
    attrs: AttrBag,
}

impl CounterpartEntity {
    #[must_use]
    pub const fn new(key: Key, attrs: AttrBag) -> Self {
        Self { key, attrs }
    }

    #[must_use]
    pub const fn key(&self) -> &Key {
        &self.key
    }

    #[must_use]
    pub const fn attrs(&self) -> &AttrBag {
        &self.attrs
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }
}

///
/// AssociationStore
///
/// Read/write access to association and counterpart records. Consumed by
/// the engine, implemented by the host's persistence layer. Every call is
/// synchronous and blocking; cancellation and write serialization are the
/// store's own concern.
///

pub trait AssociationStore {
    /// Persisted associations for one owner, optionally restricted to a
    /// counterpart key set.
    fn find_associations(
        &self,
        owner_key: &Key,
        counterpart_keys: Option<&BTreeSet<Key>>,
    ) -> Vec<AssociationRecord>;

    /// Counterpart entities, optionally filtered.
    fn find_counterparts(&self, filter: Option<&FilterExpr>) -> Vec<CounterpartEntity>;

    /// An unsaved association for the given pair, with the junction's
    /// default attributes.
    fn create_association(&self, owner_key: Key, counterpart_key: Key) -> AssociationRecord;

    /// Field-level validation, skipping the excluded fields.
    fn validate(&self, record: &AssociationRecord, excluded: &[&str]) -> Result<(), FieldErrors>;

    /// Persist one association, returning the stored form on success.
    fn save(&mut self, record: &AssociationRecord) -> Result<AssociationRecord, FieldErrors>;
}
