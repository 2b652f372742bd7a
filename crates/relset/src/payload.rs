use crate::{key::Key, value::AttrBag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Payload
///
/// Inbound edit payload: junction namespace → (counterpart key →
/// attribute bag). Always passed explicitly into the merge operations;
/// the engine never reads ambient request state.
///
/// Rows are identified by their map position. A row's bag does not need
/// to carry the secondary-role field; the engine writes the key back onto
/// rows that omit it.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Payload(BTreeMap<String, BTreeMap<Key, AttrBag>>);

impl Payload {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(
        &mut self,
        namespace: impl Into<String>,
        counterpart_key: impl Into<Key>,
        attrs: AttrBag,
    ) -> &mut Self {
        self.0
            .entry(namespace.into())
            .or_default()
            .insert(counterpart_key.into(), attrs);
        self
    }

    #[must_use]
    pub fn with(
        mut self,
        namespace: impl Into<String>,
        counterpart_key: impl Into<Key>,
        attrs: AttrBag,
    ) -> Self {
        self.insert(namespace, counterpart_key, attrs);
        self
    }

    /// Rows addressed to the given junction namespace, if any.
    #[must_use]
    pub fn rows_for(&self, namespace: &str) -> Option<&BTreeMap<Key, AttrBag>> {
        self.0.get(namespace)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
