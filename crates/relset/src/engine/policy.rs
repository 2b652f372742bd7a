use crate::{model::AssociationRecord, store::AssociationStore, value::Value};

///
/// PresenceMode
///
/// How many translations a new owner must carry. `Full` demands the
/// complete language set; `Partial` accepts any non-empty subset and
/// flags the earliest-keyed one as the default.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PresenceMode {
    Full,
    Partial,
}

///
/// TranslationPolicy
///
/// Legacy translation-validity rule, carried forward as an alternate
/// policy for the language/translation shape of this relation. Decides
/// which merged candidates are "active enough to keep" and enforces the
/// presence rule before the owner itself is accepted.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TranslationPolicy {
    mode: PresenceMode,
    active_flag: String,
    default_flag: String,
    triggers: Vec<String>,
}

impl TranslationPolicy {
    #[must_use]
    pub fn full() -> Self {
        Self::with_mode(PresenceMode::Full)
    }

    #[must_use]
    pub fn partial() -> Self {
        Self::with_mode(PresenceMode::Partial)
    }

    fn with_mode(mode: PresenceMode) -> Self {
        Self {
            mode,
            active_flag: "active".to_string(),
            default_flag: "default".to_string(),
            triggers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_active_flag(mut self, field: impl Into<String>) -> Self {
        self.active_flag = field.into();
        self
    }

    #[must_use]
    pub fn with_default_flag(mut self, field: impl Into<String>) -> Self {
        self.default_flag = field.into();
        self
    }

    /// Add an activation-trigger attribute: any non-blank trigger keeps
    /// the candidate.
    #[must_use]
    pub fn with_trigger(mut self, field: impl Into<String>) -> Self {
        self.triggers.push(field.into());
        self
    }

    #[must_use]
    pub const fn mode(&self) -> PresenceMode {
        self.mode
    }

    #[must_use]
    pub const fn default_flag(&self) -> &String {
        &self.default_flag
    }

    /// Whether a merged candidate is active enough to keep. A candidate
    /// stays if it is already persisted, explicitly flagged active,
    /// carries any non-blank trigger attribute, or independently clears
    /// full validation. Everything stays in full mode: the complete set
    /// is required, so a blank row must surface its validation failure.
    #[must_use]
    pub fn accepts<S: AssociationStore>(
        &self,
        record: &AssociationRecord,
        store: &S,
        excluded: &[&str],
    ) -> bool {
        if matches!(self.mode, PresenceMode::Full) {
            return true;
        }
        if !record.is_new() {
            return true;
        }
        if record.get(&self.active_flag).is_some_and(Value::is_truthy) {
            return true;
        }
        if self
            .triggers
            .iter()
            .any(|field| record.get(field).is_some_and(|v| !v.is_blank()))
        {
            return true;
        }

        store.validate(record, excluded).is_ok()
    }

    /// Owner error message for an empty kept set.
    #[must_use]
    pub const fn presence_error(&self) -> &'static str {
        match self.mode {
            PresenceMode::Full => "all languages must be provided",
            PresenceMode::Partial => "at least one language must be provided",
        }
    }
}
