use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// Key
///
/// The atomic, normalized key unit for owners and counterparts.
/// One relation uses one key shape in practice; ordering across shapes is
/// still total (tag order, then payload) so completed sets iterate
/// deterministically no matter what a store hands back.
///

#[derive(Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum Key {
    #[display("unit")]
    Unit,
    #[display("{_0}")]
    Int(i64),
    #[display("{_0}")]
    Uint(u64),
    #[display("{_0}")]
    Text(String),
}

impl Key {
    // ── Variant tags (do not reorder) ─────────────────
    const TAG_UNIT: u8 = 0;
    const TAG_INT: u8 = 1;
    const TAG_UINT: u8 = 2;
    const TAG_TEXT: u8 = 3;

    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Unit => Self::TAG_UNIT,
            Self::Int(_) => Self::TAG_INT,
            Self::Uint(_) => Self::TAG_UINT,
            Self::Text(_) => Self::TAG_TEXT,
        }
    }

    /// The neutral owner-key sentinel carried by synthesized associations
    /// until the owner itself has been persisted.
    #[must_use]
    pub const fn unassigned() -> Self {
        Self::Unit
    }

    #[must_use]
    pub const fn is_unassigned(&self) -> bool {
        matches!(self, Self::Unit)
    }

    /// Stable byte encoding used for scope fingerprinting.
    #[must_use]
    pub fn fingerprint_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.tag()];
        match self {
            Self::Unit => {}
            Self::Int(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Uint(v) => out.extend_from_slice(&v.to_be_bytes()),
            Self::Text(v) => out.extend_from_slice(v.as_bytes()),
        }
        out
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            _ => self.tag().cmp(&other.tag()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Key {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_ascending_within_a_variant() {
        let mut keys = vec![Key::Uint(9), Key::Uint(2), Key::Uint(5)];
        keys.sort();
        assert_eq!(keys, vec![Key::Uint(2), Key::Uint(5), Key::Uint(9)]);
    }

    #[test]
    fn text_keys_order_lexicographically() {
        assert!(Key::from("cs") < Key::from("en"));
        assert!(Key::from("en") < Key::from("sk"));
    }

    #[test]
    fn unit_sorts_before_every_other_shape() {
        assert!(Key::Unit < Key::Int(i64::MIN));
        assert!(Key::Unit < Key::Uint(0));
        assert!(Key::Unit < Key::Text(String::new()));
    }

    #[test]
    fn fingerprint_bytes_differ_across_variants_with_same_payload() {
        assert_ne!(
            Key::Int(7).fingerprint_bytes(),
            Key::Uint(7).fingerprint_bytes()
        );
    }
}
