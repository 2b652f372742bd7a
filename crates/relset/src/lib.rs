//! Relation completion & synchronization engine: present an owner record
//! together with a complete set of junction associations (one per
//! candidate counterpart, persisted or synthesized), merge partial edit
//! payloads, and validate/save only the touched subset.
//!
//! The engine is a synchronous, single-owner, single-session utility: it
//! consumes an [`store::AssociationStore`], borrows the owner for one edit
//! session, and surfaces every validation and persistence failure through
//! the owner's error bag instead of aborting the batch.

pub mod engine;
pub mod error;
pub mod key;
pub mod model;
pub mod obs;
pub mod payload;
pub mod scope;
pub mod store;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Prelude contains only domain vocabulary; stores, sinks, and helpers
/// stay one module level down.
///

pub mod prelude {
    pub use crate::{
        engine::{InterpretationAccessor, RelationCompletionEngine, TranslationPolicy},
        error::{ConfigError, SyncError},
        key::Key,
        model::{AssociationRecord, Owner, RelationSpec},
        payload::Payload,
        scope::RestrictionScope,
        value::{AttrBag, Value},
    };
}
