use crate::{key::Key, store::FieldErrors, value::AttrBag, value::Value};
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// ErrorBag
///
/// Ordered field → messages map. The single combined error surface for one
/// edit session: association field errors, persistence failures, and
/// policy errors all land here.
///

#[derive(Clone, Debug, Default, Deref, Deserialize, Eq, IntoIterator, PartialEq, Serialize)]
pub struct ErrorBag(BTreeMap<String, Vec<String>>);

impl ErrorBag {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Absorb store-reported field errors.
    pub fn absorb(&mut self, errors: FieldErrors) {
        for (field, messages) in errors {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

///
/// Owner
///
/// The entity being edited, on the "one" side of the relation. A plain
/// handle: the engine borrows it for one edit session and never stores it
/// beyond that. The key is absent until the caller persists the owner.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Owner {
    key: Option<Key>,
    attrs: AttrBag,
    #[serde(skip)]
    errors: ErrorBag,
}

impl Owner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn persisted(key: impl Into<Key>) -> Self {
        Self {
            key: Some(key.into()),
            attrs: AttrBag::new(),
            errors: ErrorBag::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.set(field, value);
        self
    }

    #[must_use]
    pub const fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    /// Record the key assigned by the caller's own persistence step.
    pub fn set_key(&mut self, key: impl Into<Key>) {
        self.key = Some(key.into());
    }

    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.key.is_none()
    }

    #[must_use]
    pub const fn attrs(&self) -> &AttrBag {
        &self.attrs
    }

    pub const fn attrs_mut(&mut self) -> &mut AttrBag {
        &mut self.attrs
    }

    #[must_use]
    pub const fn errors(&self) -> &ErrorBag {
        &self.errors
    }

    pub const fn errors_mut(&mut self) -> &mut ErrorBag {
        &mut self.errors
    }
}
