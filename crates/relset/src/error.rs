use thiserror::Error as ThisError;

///
/// ConfigError
///
/// Malformed relation configuration. Fatal: raised when an engine is
/// constructed, never during an edit session.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConfigError {
    #[error("relation config is missing the junction entity type")]
    MissingJunction,

    #[error("relation config is missing the primary role key")]
    MissingPrimaryRole,

    #[error("relation config is missing the secondary role key")]
    MissingSecondaryRole,
}

///
/// SyncError
///
/// Engine-level failures. Per-field validation and persistence failures
/// are not errors here; they aggregate onto the owner's error bag and
/// surface through the boolean results of `validate()`/`save()`.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("owner must be persisted before associations can be saved")]
    OwnerUnsaved,
}
