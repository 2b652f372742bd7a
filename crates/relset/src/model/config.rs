use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

///
/// RelationSpec
///
/// Raw relation configuration as the caller hands it over. Validated into
/// a [`RelationConfig`] when an engine is constructed; fewer than the two
/// required role keys (or a missing junction type) is a `ConfigError`.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationSpec {
    pub junction: Option<String>,
    pub primary_role: Option<String>,
    pub secondary_role: Option<String>,
    pub current_pointer: Option<String>,
}

impl RelationSpec {
    #[must_use]
    pub fn new(
        junction: impl Into<String>,
        primary_role: impl Into<String>,
        secondary_role: impl Into<String>,
    ) -> Self {
        Self {
            junction: Some(junction.into()),
            primary_role: Some(primary_role.into()),
            secondary_role: Some(secondary_role.into()),
            current_pointer: None,
        }
    }

    #[must_use]
    pub fn with_current_pointer(mut self, attr: impl Into<String>) -> Self {
        self.current_pointer = Some(attr.into());
        self
    }
}

///
/// RelationConfig
///
/// Validated relation configuration: the junction entity namespace and the
/// two foreign-key role names, plus the optional current-pointer attribute
/// on the owner.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationConfig {
    junction: String,
    primary_role: String,
    secondary_role: String,
    current_pointer: Option<String>,
}

impl RelationConfig {
    #[must_use]
    pub const fn junction(&self) -> &String {
        &self.junction
    }

    #[must_use]
    pub const fn primary_role(&self) -> &String {
        &self.primary_role
    }

    #[must_use]
    pub const fn secondary_role(&self) -> &String {
        &self.secondary_role
    }

    #[must_use]
    pub const fn current_pointer(&self) -> Option<&String> {
        self.current_pointer.as_ref()
    }
}

impl TryFrom<RelationSpec> for RelationConfig {
    type Error = ConfigError;

    fn try_from(spec: RelationSpec) -> Result<Self, Self::Error> {
        let junction = spec
            .junction
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingJunction)?;
        let primary_role = spec
            .primary_role
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingPrimaryRole)?;
        let secondary_role = spec
            .secondary_role
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecondaryRole)?;

        Ok(Self {
            junction,
            primary_role,
            secondary_role,
            current_pointer: spec.current_pointer,
        })
    }
}
