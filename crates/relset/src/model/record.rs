use crate::{key::Key, value::AttrBag, value::Value};
use serde::{Deserialize, Serialize};

///
/// RecordState
///
/// Lifecycle of one association record within one engine instance:
/// `Synthesized → Saved` or `Persisted → Saved`. `Saved` is terminal; a
/// record never regresses to an earlier state.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum RecordState {
    /// Created in memory to fill a gap; never written to storage.
    Synthesized,
    /// Loaded from storage with a stable identity.
    Persisted,
    /// Written to storage during this engine instance.
    Saved,
}

///
/// AssociationRecord
///
/// The junction entity linking one owner to one counterpart, carrying the
/// relation's business attributes. At most one record exists per
/// (owner, counterpart) pair.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AssociationRecord {
    owner_key: Key,
    counterpart_key: Key,
    attrs: AttrBag,
    state: RecordState,
}

impl AssociationRecord {
    /// A gap-filling placeholder. The owner key is the caller's key when
    /// the owner is already persisted, `Key::unassigned()` otherwise.
    #[must_use]
    pub const fn synthesized(owner_key: Key, counterpart_key: Key) -> Self {
        Self {
            owner_key,
            counterpart_key,
            attrs: AttrBag::new(),
            state: RecordState::Synthesized,
        }
    }

    /// A record loaded from storage.
    #[must_use]
    pub const fn persisted(owner_key: Key, counterpart_key: Key, attrs: AttrBag) -> Self {
        Self {
            owner_key,
            counterpart_key,
            attrs,
            state: RecordState::Persisted,
        }
    }

    #[must_use]
    pub const fn owner_key(&self) -> &Key {
        &self.owner_key
    }

    pub fn set_owner_key(&mut self, key: Key) {
        self.owner_key = key;
    }

    #[must_use]
    pub const fn counterpart_key(&self) -> &Key {
        &self.counterpart_key
    }

    pub fn set_counterpart_key(&mut self, key: Key) {
        self.counterpart_key = key;
    }

    #[must_use]
    pub const fn attrs(&self) -> &AttrBag {
        &self.attrs
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.attrs.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.attrs.set(field, value);
    }

    /// Bulk-assign payload attributes onto this record.
    pub fn assign(&mut self, attrs: &AttrBag) {
        self.attrs.assign(attrs);
    }

    #[must_use]
    pub const fn state(&self) -> RecordState {
        self.state
    }

    /// A synthesized record has never been saved.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        matches!(self.state, RecordState::Synthesized)
    }

    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self.state, RecordState::Saved)
    }

    pub fn mark_saved(&mut self) {
        self.state = RecordState::Saved;
    }
}
