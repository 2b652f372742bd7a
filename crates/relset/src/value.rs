use crate::key::Key;
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

///
/// Value
///
/// Typed attribute value carried by association records, counterpart
/// entities, and filter clauses. This is the declared replacement for the
/// open-ended dynamic property access the relation source data tends to
/// arrive with: every attribute read is `get(field) -> Option<&Value>`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Text(String),
}

impl Value {
    // ── Variant tags (do not reorder) ─────────────────
    const TAG_UNIT: u8 = 0;
    const TAG_BOOL: u8 = 1;
    const TAG_INT: u8 = 2;
    const TAG_UINT: u8 = 3;
    const TAG_TEXT: u8 = 4;

    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Unit => Self::TAG_UNIT,
            Self::Bool(_) => Self::TAG_BOOL,
            Self::Int(_) => Self::TAG_INT,
            Self::Uint(_) => Self::TAG_UINT,
            Self::Text(_) => Self::TAG_TEXT,
        }
    }

    /// Blank test used by activation triggers: a trigger attribute counts
    /// as filled only when it holds a non-default payload.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Unit => true,
            Self::Bool(v) => !v,
            Self::Int(v) => *v == 0,
            Self::Uint(v) => *v == 0,
            Self::Text(v) => v.is_empty(),
        }
    }

    /// Truthiness used by the active-flag policy attribute.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !self.is_blank()
    }

    /// Decode this value as a counterpart key, when it carries one.
    /// Used for the owner's current-pointer attribute.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Self::Int(v) => Some(Key::Int(*v)),
            Self::Uint(v) => Some(Key::Uint(*v)),
            Self::Text(v) => Some(Key::Text(v.clone())),
            Self::Unit | Self::Bool(_) => None,
        }
    }

    /// Stable byte encoding used for scope fingerprinting.
    #[must_use]
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.tag()];
        match self {
            Self::Unit => {}
            Self::Bool(v) => out.push(u8::from(*v)),
            Self::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Uint(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Text(v) => out.extend_from_slice(v.as_bytes()),
        }
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("unit"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        match key {
            Key::Unit => Self::Unit,
            Key::Int(v) => Self::Int(*v),
            Key::Uint(v) => Self::Uint(*v),
            Key::Text(v) => Self::Text(v.clone()),
        }
    }
}

///
/// AttrBag
///
/// Ordered field → value map. Bulk assignment merges field-by-field, the
/// way form payload rows are applied onto association records.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, IntoIterator, PartialEq, Serialize,
)]
pub struct AttrBag(BTreeMap<String, Value>);

impl AttrBag {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.0.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Merge every field of `other` onto this bag, overwriting collisions.
    pub fn assign(&mut self, other: &Self) {
        for (field, value) in &other.0 {
            self.0.insert(field.clone(), value.clone());
        }
    }
}
