//! Shared fixtures: a language/translation relation backed by the memory
//! store, the shape most engine tests exercise.

use crate::{
    key::Key,
    model::{AssociationRecord, RelationSpec},
    store::{CounterpartEntity, FieldRule, MemoryAssociationStore},
    value::AttrBag,
};

pub(crate) const JUNCTION: &str = "translation";
pub(crate) const PRIMARY_ROLE: &str = "article_id";
pub(crate) const SECONDARY_ROLE: &str = "language_id";

/// Store with `count` languages keyed `Uint(1..=count)` and a required,
/// length-capped `title` field on the translation junction.
pub(crate) fn languages_store(count: u64) -> MemoryAssociationStore {
    const CODES: [&str; 5] = ["cs", "en", "de", "sk", "fr"];

    let mut store = MemoryAssociationStore::new(PRIMARY_ROLE)
        .with_rule(FieldRule::required("title"))
        .with_rule(FieldRule::max_len("title", 32));

    for id in 1..=count {
        let code = CODES[usize::try_from(id - 1).unwrap() % CODES.len()];
        store.insert_counterpart(CounterpartEntity::new(
            Key::Uint(id),
            AttrBag::new().with("code", code),
        ));
    }

    store
}

pub(crate) fn translation_spec() -> RelationSpec {
    RelationSpec::new(JUNCTION, PRIMARY_ROLE, SECONDARY_ROLE)
}

/// Seed one persisted translation for (owner, language) with a title.
pub(crate) fn seed_translation(
    store: &mut MemoryAssociationStore,
    owner: u64,
    language: u64,
    title: &str,
) {
    store.insert_association(AssociationRecord::persisted(
        Key::Uint(owner),
        Key::Uint(language),
        AttrBag::new().with("title", title),
    ));
}
