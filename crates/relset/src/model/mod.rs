//! Domain model: the owner handle, the junction association record, and
//! the relation configuration.

mod config;
mod owner;
mod record;

pub use config::{RelationConfig, RelationSpec};
pub use owner::{ErrorBag, Owner};
pub use record::{AssociationRecord, RecordState};
