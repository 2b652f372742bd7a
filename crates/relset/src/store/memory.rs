use crate::{
    key::Key,
    model::AssociationRecord,
    scope::FilterExpr,
    store::{AssociationStore, CounterpartEntity, FieldErrors},
    value::{AttrBag, Value},
};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

///
/// FieldRule
///
/// Declarative per-field constraint applied by the memory store's
/// validator. Enough to express the junction schemas this engine is
/// exercised against; a production adapter brings its own validation.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldRule {
    Required { field: String },
    MaxLen { field: String, limit: usize },
}

impl FieldRule {
    #[must_use]
    pub fn required(field: impl Into<String>) -> Self {
        Self::Required {
            field: field.into(),
        }
    }

    #[must_use]
    pub fn max_len(field: impl Into<String>, limit: usize) -> Self {
        Self::MaxLen {
            field: field.into(),
            limit,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Required { field } | Self::MaxLen { field, .. } => field,
        }
    }

    fn check(&self, attrs: &AttrBag, errors: &mut FieldErrors) {
        match self {
            Self::Required { field } => {
                let blank = attrs.get(field).is_none_or(Value::is_blank);
                if blank {
                    errors.push(field.clone(), format!("{field} is required"));
                }
            }
            Self::MaxLen { field, limit } => {
                if let Some(Value::Text(text)) = attrs.get(field)
                    && text.chars().count() > *limit
                {
                    errors.push(
                        field.clone(),
                        format!("{field} exceeds maximum length of {limit}"),
                    );
                }
            }
        }
    }
}

///
/// MemoryAssociationStore
///
/// BTreeMap-backed reference store: a counterpart registry, an association
/// table keyed by (owner, counterpart), and a declarative field-rule
/// validator. Read counters let callers observe query traffic, which is
/// how the completion cache's no-re-query property is asserted.
///

pub struct MemoryAssociationStore {
    primary_field: String,
    rules: Vec<FieldRule>,
    counterparts: BTreeMap<Key, CounterpartEntity>,
    associations: BTreeMap<(Key, Key), AssociationRecord>,
    association_reads: Cell<u64>,
    counterpart_reads: Cell<u64>,
}

impl MemoryAssociationStore {
    #[must_use]
    pub fn new(primary_field: impl Into<String>) -> Self {
        Self {
            primary_field: primary_field.into(),
            rules: Vec::new(),
            counterparts: BTreeMap::new(),
            associations: BTreeMap::new(),
            association_reads: Cell::new(0),
            counterpart_reads: Cell::new(0),
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn insert_counterpart(&mut self, entity: CounterpartEntity) {
        self.counterparts.insert(entity.key().clone(), entity);
    }

    /// Seed one persisted association, bypassing validation. Test and
    /// fixture loading path.
    pub fn insert_association(&mut self, record: AssociationRecord) {
        self.associations.insert(
            (record.owner_key().clone(), record.counterpart_key().clone()),
            record,
        );
    }

    #[must_use]
    pub fn association_reads(&self) -> u64 {
        self.association_reads.get()
    }

    #[must_use]
    pub fn counterpart_reads(&self) -> u64 {
        self.counterpart_reads.get()
    }

    #[must_use]
    pub fn association_count(&self) -> usize {
        self.associations.len()
    }

    fn check_owner_reference(
        &self,
        record: &AssociationRecord,
        excluded: &[&str],
        errors: &mut FieldErrors,
    ) {
        if excluded.contains(&self.primary_field.as_str()) {
            return;
        }
        if record.owner_key().is_unassigned() {
            errors.push(
                self.primary_field.clone(),
                format!("{} is required", self.primary_field),
            );
        }
    }
}

impl AssociationStore for MemoryAssociationStore {
    fn find_associations(
        &self,
        owner_key: &Key,
        counterpart_keys: Option<&BTreeSet<Key>>,
    ) -> Vec<AssociationRecord> {
        self.association_reads.set(self.association_reads.get() + 1);

        self.associations
            .values()
            .filter(|rec| rec.owner_key() == owner_key)
            .filter(|rec| counterpart_keys.is_none_or(|keys| keys.contains(rec.counterpart_key())))
            .cloned()
            .collect()
    }

    fn find_counterparts(&self, filter: Option<&FilterExpr>) -> Vec<CounterpartEntity> {
        self.counterpart_reads.set(self.counterpart_reads.get() + 1);

        self.counterparts
            .values()
            .filter(|entity| filter.is_none_or(|f| f.matches(entity.attrs())))
            .cloned()
            .collect()
    }

    fn create_association(&self, owner_key: Key, counterpart_key: Key) -> AssociationRecord {
        AssociationRecord::synthesized(owner_key, counterpart_key)
    }

    fn validate(&self, record: &AssociationRecord, excluded: &[&str]) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        self.check_owner_reference(record, excluded, &mut errors);
        for rule in &self.rules {
            if excluded.contains(&rule.field()) {
                continue;
            }
            rule.check(record.attrs(), &mut errors);
        }

        errors.into_result()
    }

    fn save(&mut self, record: &AssociationRecord) -> Result<AssociationRecord, FieldErrors> {
        self.validate(record, &[])?;

        let stored = AssociationRecord::persisted(
            record.owner_key().clone(),
            record.counterpart_key().clone(),
            record.attrs().clone(),
        );
        self.associations.insert(
            (stored.owner_key().clone(), stored.counterpart_key().clone()),
            stored.clone(),
        );

        Ok(stored)
    }
}
