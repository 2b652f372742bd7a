//! Restriction scopes: which counterparts are in play for a given call.
//!
//! A scope is the cache key of the completion engine, so everything here
//! must fingerprint deterministically.

use crate::{key::Key, value::AttrBag, value::Value};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeSet;

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Lte = 0x04,
    Gt = 0x05,
    Gte = 0x06,
    Contains = 0x07,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

///
/// FilterClause
///
/// One field comparison. Ordering comparisons only hold between values of
/// the same shape; a shape mismatch fails the clause rather than erroring,
/// matching how a store-side predicate would drop the row.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FilterClause {
    pub field: String,
    pub op: CompareOp,
    pub value: Value,
}

impl FilterClause {
    #[must_use]
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    #[must_use]
    pub fn matches(&self, attrs: &AttrBag) -> bool {
        let Some(actual) = attrs.get(&self.field) else {
            return false;
        };

        match self.op {
            CompareOp::Eq => actual == &self.value,
            CompareOp::Ne => actual != &self.value,
            CompareOp::Lt => same_shape_cmp(actual, &self.value) == Some(Ordering::Less),
            CompareOp::Lte => matches!(
                same_shape_cmp(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
            CompareOp::Gt => same_shape_cmp(actual, &self.value) == Some(Ordering::Greater),
            CompareOp::Gte => matches!(
                same_shape_cmp(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            CompareOp::Contains => match (actual, &self.value) {
                (Value::Text(haystack), Value::Text(needle)) => haystack.contains(needle),
                _ => false,
            },
        }
    }
}

fn same_shape_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Uint(x), Value::Uint(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

///
/// FilterExpr
///
/// Conjunction of clauses; empty means match-all.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct FilterExpr {
    clauses: Vec<FilterClause>,
}

impl FilterExpr {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            clauses: Vec::new(),
        }
    }

    #[must_use]
    pub fn and(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    #[must_use]
    pub fn matches(&self, attrs: &AttrBag) -> bool {
        self.clauses.iter().all(|clause| clause.matches(attrs))
    }
}

///
/// ScopeFingerprint
///
/// Stable, deterministic fingerprint for restriction scopes; the key of
/// the completion cache.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ScopeFingerprint([u8; 32]);

impl ScopeFingerprint {
    #[must_use]
    pub fn as_hex(&self) -> String {
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            use std::fmt::Write as _;
            let _ = write!(out, "{byte:02x}");
        }
        out
    }
}

impl std::fmt::Display for ScopeFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_hex())
    }
}

///
/// RestrictionScope
///
/// Optional counterpart key set and optional counterpart filter, applied
/// conjunctively when both are present. An unrestricted scope admits every
/// counterpart the store knows.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RestrictionScope {
    keys: Option<BTreeSet<Key>>,
    filter: Option<FilterExpr>,
}

impl RestrictionScope {
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            keys: None,
            filter: None,
        }
    }

    #[must_use]
    pub fn for_keys(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: Some(keys.into_iter().collect()),
            filter: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub const fn key_set(&self) -> Option<&BTreeSet<Key>> {
        self.keys.as_ref()
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&FilterExpr> {
        self.filter.as_ref()
    }

    /// Narrow this scope to a payload-derived key list. The existing filter
    /// is preserved; an existing key set intersects with the new one.
    #[must_use]
    pub fn narrowed_to(&self, keys: impl IntoIterator<Item = Key>) -> Self {
        let incoming: BTreeSet<Key> = keys.into_iter().collect();
        let keys = match &self.keys {
            Some(existing) => existing.intersection(&incoming).cloned().collect(),
            None => incoming,
        };

        Self {
            keys: Some(keys),
            filter: self.filter.clone(),
        }
    }

    #[must_use]
    pub fn admits_key(&self, key: &Key) -> bool {
        self.keys.as_ref().is_none_or(|keys| keys.contains(key))
    }

    #[must_use]
    pub fn admits(&self, key: &Key, attrs: &AttrBag) -> bool {
        self.admits_key(key)
            && self
                .filter
                .as_ref()
                .is_none_or(|filter| filter.matches(attrs))
    }

    /// Compute the stable fingerprint for this scope.
    #[must_use]
    pub fn fingerprint(&self) -> ScopeFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(b"relset:scope:v1");

        write_tag(&mut hasher, 0x01);
        match &self.keys {
            None => write_u32(&mut hasher, u32::MAX),
            Some(keys) => {
                write_u32(&mut hasher, u32::try_from(keys.len()).unwrap_or(u32::MAX));
                for key in keys {
                    write_bytes(&mut hasher, &key.fingerprint_bytes());
                }
            }
        }

        write_tag(&mut hasher, 0x02);
        match &self.filter {
            None => write_u32(&mut hasher, u32::MAX),
            Some(filter) => {
                let clauses = filter.clauses();
                write_u32(&mut hasher, u32::try_from(clauses.len()).unwrap_or(u32::MAX));
                for clause in clauses {
                    write_bytes(&mut hasher, clause.field.as_bytes());
                    write_tag(&mut hasher, clause.op.tag());
                    write_bytes(&mut hasher, &clause.value.fingerprint_bytes());
                }
            }
        }

        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        ScopeFingerprint(out)
    }
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}

fn write_u32(hasher: &mut Sha256, value: u32) {
    hasher.update(value.to_be_bytes());
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    write_u32(hasher, u32::try_from(bytes.len()).unwrap_or(u32::MAX));
    hasher.update(bytes);
}
