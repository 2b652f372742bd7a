use crate::{
    engine::{CompletedSet, RelationCompletionEngine},
    key::Key,
    store::AssociationStore,
    value::Value,
};

///
/// InterpretationAccessor
///
/// Thin read façade for consumers that only need attribute values, not
/// mutation. No caching of its own; delegates entirely to the engine, and
/// has no failure modes beyond `None` propagation.
///

pub struct InterpretationAccessor<'e, 'a, S: AssociationStore> {
    engine: &'e mut RelationCompletionEngine<'a, S>,
}

impl<'e, 'a, S: AssociationStore> InterpretationAccessor<'e, 'a, S> {
    pub(crate) const fn new(engine: &'e mut RelationCompletionEngine<'a, S>) -> Self {
        Self { engine }
    }

    /// Attribute of the current association.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.engine.interpret(field)
    }

    /// Attribute of the materialized association for one counterpart.
    #[must_use]
    pub fn get_at(&self, field: &str, counterpart_key: &Key) -> Option<Value> {
        self.engine.interpret_at(field, counterpart_key)
    }

    /// Materialized associations for the engine's current scope.
    #[must_use]
    pub fn all(&self) -> CompletedSet {
        self.engine.associations()
    }

    /// The complete counterpart → association mapping, gaps filled.
    pub fn all_complete(&mut self) -> &CompletedSet {
        self.engine.all_associations()
    }
}
