use crate::{
    engine::{RelationCompletionEngine, TranslationPolicy},
    error::{ConfigError, SyncError},
    key::Key,
    model::Owner,
    obs::{RecordingSink, SyncTraceEvent},
    payload::Payload,
    scope::{CompareOp, FilterClause, FilterExpr, RestrictionScope},
    store::{AssociationStore, CounterpartEntity, MemoryAssociationStore},
    test_support::{JUNCTION, languages_store, seed_translation, translation_spec},
    value::{AttrBag, Value},
};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn engine<'a>(
    owner: &'a mut Owner,
    store: &'a mut MemoryAssociationStore,
) -> RelationCompletionEngine<'a, MemoryAssociationStore> {
    RelationCompletionEngine::new(owner, store, translation_spec()).unwrap()
}

// ---- construction ------------------------------------------------------

#[test]
fn construction_rejects_incomplete_specs() {
    let mut owner = Owner::new();
    let mut store = languages_store(1);

    let mut spec = translation_spec();
    spec.secondary_role = None;

    let err = RelationCompletionEngine::new(&mut owner, &mut store, spec).unwrap_err();
    assert_eq!(err, ConfigError::MissingSecondaryRole);
}

// ---- completion --------------------------------------------------------

#[test]
fn completion_yields_one_entry_per_counterpart_ascending() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);
    seed_translation(&mut store, 9, 2, "Hello");

    let mut engine = engine(&mut owner, &mut store);
    let all = engine.all_associations();

    assert_eq!(all.len(), 3);
    let keys: Vec<&Key> = all.keys().collect();
    assert_eq!(keys, vec![&Key::Uint(1), &Key::Uint(2), &Key::Uint(3)]);

    // The persisted row is never replaced by a synthesized placeholder.
    assert_eq!(all[&Key::Uint(2)].get("title"), Some(&Value::from("Hello")));
    assert!(!all[&Key::Uint(2)].is_new());
    assert!(all[&Key::Uint(1)].is_new());
    assert!(all[&Key::Uint(3)].is_new());
}

#[test]
fn synthesized_rows_carry_the_owner_key_when_persisted() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    for rec in engine.all_associations().values() {
        assert_eq!(rec.owner_key(), &Key::Uint(9));
    }
}

#[test]
fn synthesized_rows_carry_the_sentinel_for_new_owners() {
    let mut owner = Owner::new();
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    for rec in engine.all_associations().values() {
        assert!(rec.owner_key().is_unassigned());
    }
}

#[test]
fn scope_key_restriction_bounds_the_completed_set() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(4);

    let mut engine = engine(&mut owner, &mut store)
        .with_scope(RestrictionScope::for_keys([Key::Uint(2), Key::Uint(4)]));

    let keys: Vec<Key> = engine.all_associations().keys().cloned().collect();
    assert_eq!(keys, vec![Key::Uint(2), Key::Uint(4)]);
}

#[test]
fn scope_filter_excludes_non_matching_counterparts() {
    let mut owner = Owner::persisted(9u64);
    let mut store = MemoryAssociationStore::new("article_id");
    store.insert_counterpart(CounterpartEntity::new(
        Key::Uint(1),
        AttrBag::new().with("active", true),
    ));
    store.insert_counterpart(CounterpartEntity::new(
        Key::Uint(2),
        AttrBag::new().with("active", false),
    ));

    let scope = RestrictionScope::unrestricted()
        .with_filter(FilterExpr::new().and(FilterClause::new("active", CompareOp::Eq, true)));
    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, translation_spec())
        .unwrap()
        .with_scope(scope);

    let keys: Vec<Key> = engine.all_associations().keys().cloned().collect();
    assert_eq!(keys, vec![Key::Uint(1)]);
}

// ---- caching -----------------------------------------------------------

#[test]
fn repeated_completion_with_the_same_scope_does_not_requery() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);

    {
        let mut engine = engine(&mut owner, &mut store);
        engine.all_associations();
        engine.all_associations();

        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 1, 1));
    }

    // One miss means one association query and one counterpart listing.
    assert_eq!(store.association_reads(), 1);
    assert_eq!(store.counterpart_reads(), 1);
}

#[test]
fn distinct_scopes_cache_under_distinct_keys() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);

    {
        let mut engine = engine(&mut owner, &mut store);
        engine.all_associations();
        engine.set_scope(RestrictionScope::for_keys([Key::Uint(1)]));
        engine.all_associations();
        // Back to a cached scope: served without recomputing.
        engine.set_scope(RestrictionScope::unrestricted());
        engine.all_associations();

        let stats = engine.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.size), (1, 2, 2));
    }

    assert_eq!(store.association_reads(), 2);
}

#[test]
fn disabled_cache_recomputes_every_call() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);

    {
        let mut engine = engine(&mut owner, &mut store).with_cache(false);
        engine.all_associations();
        engine.all_associations();
    }

    assert_eq!(store.association_reads(), 2);
}

#[test]
fn trace_sink_observes_cache_traffic() {
    let sink = RecordingSink::default();
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store).with_trace_sink(&sink);
    engine.all_associations();
    engine.all_associations();

    let events = sink.events();
    assert!(matches!(events[0], SyncTraceEvent::CacheMiss { .. }));
    assert!(matches!(
        events[1],
        SyncTraceEvent::Completed {
            persisted: 0,
            synthesized: 2,
            ..
        }
    ));
    assert!(matches!(events[2], SyncTraceEvent::CacheHit { .. }));
}

// ---- payload merge -----------------------------------------------------

#[test]
fn merge_touches_exactly_the_payload_keys() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);
    seed_translation(&mut store, 9, 1, "One");
    seed_translation(&mut store, 9, 2, "Two");

    let mut engine = engine(&mut owner, &mut store);
    let payload =
        Payload::new().with(JUNCTION, 2u64, AttrBag::new().with("title", "Two edited"));
    engine.set_associations(&payload);

    let set = engine.associations();
    assert_eq!(
        set[&Key::Uint(2)].get("title"),
        Some(&Value::from("Two edited"))
    );
    // Untouched rows keep their stored attributes.
    assert_eq!(set[&Key::Uint(1)].get("title"), Some(&Value::from("One")));

    assert_eq!(engine.dirty().len(), 1);
    assert!(engine.dirty().contains_key(&Key::Uint(2)));
}

#[test]
fn dirty_rows_shadow_stale_store_reads() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(1);
    seed_translation(&mut store, 9, 1, "stored");

    let mut engine = engine(&mut owner, &mut store);
    let payload = Payload::new().with(JUNCTION, 1u64, AttrBag::new().with("title", "edited"));
    engine.set_associations(&payload);

    // Both the materialized view and the completed view see the edit.
    assert_eq!(
        engine.associations()[&Key::Uint(1)].get("title"),
        Some(&Value::from("edited"))
    );
    assert_eq!(
        engine.all_associations()[&Key::Uint(1)].get("title"),
        Some(&Value::from("edited"))
    );
}

#[test]
fn payload_without_this_relation_is_a_noop() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    engine.set_associations(
        &Payload::new().with(JUNCTION, 1u64, AttrBag::new().with("title", "kept")),
    );
    assert_eq!(engine.dirty().len(), 1);

    let unrelated = Payload::new().with("tagging", 5u64, AttrBag::new());
    engine.set_associations(&unrelated);

    assert_eq!(engine.dirty().len(), 1);
    assert_eq!(
        engine.dirty()[&Key::Uint(1)].get("title"),
        Some(&Value::from("kept"))
    );
}

#[test]
fn payload_keys_outside_the_candidate_set_are_skipped() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    let payload = Payload::new()
        .with(JUNCTION, 1u64, AttrBag::new().with("title", "ok"))
        .with(JUNCTION, 99u64, AttrBag::new().with("title", "ghost"));
    engine.set_associations(&payload);

    assert_eq!(engine.dirty().len(), 1);
    assert!(!engine.dirty().contains_key(&Key::Uint(99)));
}

#[test]
fn rows_without_the_role_attribute_get_it_from_their_position() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    let payload = Payload::new()
        .with(JUNCTION, 1u64, AttrBag::new().with("title", "implicit"))
        .with(
            JUNCTION,
            2u64,
            AttrBag::new()
                .with("title", "explicit")
                .with("language_id", 2u64),
        );
    engine.set_associations(&payload);

    assert_eq!(
        engine.dirty()[&Key::Uint(1)].get("language_id"),
        Some(&Value::Uint(1))
    );
    assert_eq!(
        engine.dirty()[&Key::Uint(2)].get("language_id"),
        Some(&Value::Uint(2))
    );
}

#[test]
fn set_all_applies_one_bag_uniformly() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);
    seed_translation(&mut store, 9, 2, "kept elsewhere");

    let mut engine = engine(&mut owner, &mut store);
    engine.set_all_associations(&AttrBag::new().with("reviewed", true));

    assert_eq!(engine.dirty().len(), 3);
    for rec in engine.dirty().values() {
        assert_eq!(rec.get("reviewed"), Some(&Value::Bool(true)));
    }
    // Existing attributes survive the uniform assignment.
    assert_eq!(
        engine.dirty()[&Key::Uint(2)].get("title"),
        Some(&Value::from("kept elsewhere"))
    );
}

// ---- validation --------------------------------------------------------

#[test]
fn empty_dirty_set_is_trivially_valid() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    assert!(engine.validate());
    assert!(engine.owner().errors().is_empty());
}

#[test]
fn field_failures_aggregate_onto_the_owner_without_flagging_the_fk() {
    let mut owner = Owner::new();
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    // Title left blank on a required field; the owner is still unsaved.
    let payload = Payload::new().with(JUNCTION, 1u64, AttrBag::new().with("title", ""));
    engine.set_associations(&payload);

    assert!(!engine.validate());
    let errors = engine.owner().errors();
    assert!(errors.contains_key("title"));
    // The unsaved owner's foreign key is excluded, never an error itself.
    assert!(!errors.contains_key("article_id"));
}

#[test]
fn validation_is_exhaustive_across_the_dirty_set() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(2);

    let mut engine = engine(&mut owner, &mut store);
    let payload = Payload::new()
        .with(JUNCTION, 1u64, AttrBag::new().with("title", ""))
        .with(
            JUNCTION,
            2u64,
            AttrBag::new().with("title", "far far far too long for the cap rule"),
        );
    engine.set_associations(&payload);

    assert!(!engine.validate());
    // Both rows reported in one pass: required and max-length messages.
    let messages = engine.owner().errors().get("title").unwrap();
    assert_eq!(messages.len(), 2);
}

// ---- translation policy ------------------------------------------------

#[test]
fn partial_mode_requires_at_least_one_translation() {
    let mut owner = Owner::new();
    let mut store = languages_store(2);

    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, translation_spec())
        .unwrap()
        .with_policy(TranslationPolicy::partial());

    assert!(!engine.validate());
    let messages = engine.owner().errors().get(JUNCTION).unwrap();
    assert_eq!(messages[0], "at least one language must be provided");
}

#[test]
fn full_mode_requires_all_translations() {
    let mut owner = Owner::new();
    let mut store = languages_store(2);

    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, translation_spec())
        .unwrap()
        .with_policy(TranslationPolicy::full());

    assert!(!engine.validate());
    let messages = engine.owner().errors().get(JUNCTION).unwrap();
    assert_eq!(messages[0], "all languages must be provided");
}

#[test]
fn partial_mode_flags_the_earliest_translation_as_default() {
    let mut owner = Owner::new();
    let mut store = languages_store(3);

    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, translation_spec())
        .unwrap()
        .with_policy(TranslationPolicy::partial());

    let payload = Payload::new()
        .with(JUNCTION, 3u64, AttrBag::new().with("title", "Drei"))
        .with(JUNCTION, 2u64, AttrBag::new().with("title", "Two"));
    engine.set_associations(&payload);

    assert!(engine.validate());
    assert_eq!(
        engine.dirty()[&Key::Uint(2)].get("default"),
        Some(&Value::Bool(true))
    );
    assert_eq!(engine.dirty()[&Key::Uint(3)].get("default"), None);
}

#[test]
fn partial_mode_drops_blank_rows_instead_of_failing_them() {
    let mut owner = Owner::new();
    let mut store = languages_store(2);

    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, translation_spec())
        .unwrap()
        .with_policy(TranslationPolicy::partial());

    // One filled row, one left blank by the editor.
    let payload = Payload::new()
        .with(JUNCTION, 1u64, AttrBag::new().with("title", "Ahoj"))
        .with(JUNCTION, 2u64, AttrBag::new().with("title", ""));
    engine.set_associations(&payload);

    assert_eq!(engine.dirty().len(), 1);
    assert!(engine.validate());
    assert!(engine.owner().errors().is_empty());
}

// ---- save --------------------------------------------------------------

#[test]
fn save_requires_a_persisted_owner() {
    let mut owner = Owner::new();
    let mut store = languages_store(1);

    let mut engine = engine(&mut owner, &mut store);
    assert_eq!(engine.save(), Err(SyncError::OwnerUnsaved));
}

#[test]
fn save_is_best_effort_across_the_batch() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);

    {
        let mut engine = engine(&mut owner, &mut store);
        let payload = Payload::new()
            .with(JUNCTION, 1u64, AttrBag::new().with("title", "One"))
            .with(
                JUNCTION,
                2u64,
                AttrBag::new().with("title", "this title is well past the thirty-two cap"),
            )
            .with(JUNCTION, 3u64, AttrBag::new().with("title", "Three"));
        engine.set_associations(&payload);

        // Row 2 fails; rows 1 and 3 are still attempted and persisted.
        assert_eq!(engine.save(), Ok(false));
        assert!(engine.owner().errors().contains_key("title"));
        assert_eq!(engine.owner().errors().get("title").map(Vec::len), Some(1));

        assert!(engine.dirty()[&Key::Uint(1)].is_saved());
        assert!(!engine.dirty()[&Key::Uint(2)].is_saved());
        assert!(engine.dirty()[&Key::Uint(3)].is_saved());
    }

    assert_eq!(store.association_count(), 2);
    let saved = store.find_associations(&Key::Uint(9), None);
    let keys: Vec<&Key> = saved.iter().map(|rec| rec.counterpart_key()).collect();
    assert_eq!(keys, vec![&Key::Uint(1), &Key::Uint(3)]);
}

#[test]
fn deferred_owner_key_flows_into_saved_rows() {
    let mut owner = Owner::new();
    let mut store = languages_store(1);

    {
        let mut engine = engine(&mut owner, &mut store);
        let payload = Payload::new().with(JUNCTION, 1u64, AttrBag::new().with("title", "Ahoj"));
        engine.set_associations(&payload);
        assert!(engine.validate());

        // Caller persists the owner, then records the key through the
        // engine's handle before saving.
        engine.owner_mut().set_key(42u64);
        assert_eq!(engine.save(), Ok(true));
    }

    let saved = store.find_associations(&Key::Uint(42), None);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].owner_key(), &Key::Uint(42));
}

#[test]
fn round_trip_reproduces_attributes_in_a_fresh_engine() {
    let mut store = languages_store(3);

    {
        let mut owner = Owner::persisted(9u64);
        let mut engine = engine(&mut owner, &mut store);
        engine.set_all_associations(&AttrBag::new().with("title", "same everywhere"));
        assert_eq!(engine.save(), Ok(true));
    }

    let mut owner = Owner::persisted(9u64);
    let mut engine = engine(&mut owner, &mut store);
    let all = engine.all_associations();

    assert_eq!(all.len(), 3);
    for rec in all.values() {
        assert_eq!(rec.get("title"), Some(&Value::from("same everywhere")));
        assert!(!rec.is_new());
    }
}

// ---- current pointer & interpretation ----------------------------------

#[test]
fn current_pointer_resolves_to_a_materialized_row() {
    let mut owner = Owner::persisted(9u64).with_attr("current_language_id", 2u64);
    let mut store = languages_store(3);
    seed_translation(&mut store, 9, 2, "Hello");

    let spec = translation_spec().with_current_pointer("current_language_id");
    let engine = RelationCompletionEngine::new(&mut owner, &mut store, spec).unwrap();

    let current = engine.current_association().unwrap();
    assert_eq!(current.counterpart_key(), &Key::Uint(2));
    assert_eq!(engine.interpret("title"), Some(Value::from("Hello")));
}

#[test]
fn interpretation_sees_materialized_rows_only() {
    let mut owner = Owner::persisted(9u64);
    let mut store = languages_store(3);
    seed_translation(&mut store, 9, 2, "Hello");

    let engine = engine(&mut owner, &mut store);
    assert_eq!(
        engine.interpret_at("title", &Key::Uint(2)),
        Some(Value::from("Hello"))
    );
    // Language 3 exists as a counterpart but has no materialized row.
    assert_eq!(engine.interpret_at("title", &Key::Uint(3)), None);
    // No pointer configured: no current association to interpret.
    assert_eq!(engine.interpret("title"), None);
}

#[test]
fn accessor_delegates_to_the_engine() {
    let mut owner = Owner::persisted(9u64).with_attr("current_language_id", 1u64);
    let mut store = languages_store(2);
    seed_translation(&mut store, 9, 1, "Jedna");

    let spec = translation_spec().with_current_pointer("current_language_id");
    let mut engine = RelationCompletionEngine::new(&mut owner, &mut store, spec).unwrap();
    let mut accessor = engine.accessor();

    assert_eq!(accessor.get("title"), Some(Value::from("Jedna")));
    assert_eq!(
        accessor.get_at("title", &Key::Uint(1)),
        Some(Value::from("Jedna"))
    );
    assert_eq!(accessor.all().len(), 1);
    assert_eq!(accessor.all_complete().len(), 2);
}

// ---- properties --------------------------------------------------------

proptest! {
    #[test]
    fn completion_covers_exactly_the_scope_matching_counterparts(
        ids in prop::collection::btree_set(1u64..60, 0..10),
        restriction in prop::collection::btree_set(1u64..60, 0..10),
        restricted in any::<bool>(),
    ) {
        let mut store = MemoryAssociationStore::new("article_id");
        for id in &ids {
            store.insert_counterpart(CounterpartEntity::new(Key::Uint(*id), AttrBag::new()));
        }

        let mut owner = Owner::persisted(9u64);
        let mut engine = RelationCompletionEngine::new(
            &mut owner,
            &mut store,
            translation_spec(),
        ).unwrap();
        if restricted {
            engine.set_scope(RestrictionScope::for_keys(
                restriction.iter().map(|id| Key::Uint(*id)),
            ));
        }

        let expected: BTreeSet<Key> = ids
            .iter()
            .filter(|id| !restricted || restriction.contains(id))
            .map(|id| Key::Uint(*id))
            .collect();
        let actual: BTreeSet<Key> = engine.all_associations().keys().cloned().collect();

        prop_assert_eq!(actual, expected);
    }
}
