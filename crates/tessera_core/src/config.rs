//! # Root Configuration
//!
//! Loaded once at startup, usually from a TOML file next to the game data.
//!
//! ```toml
//! standard_group = 0
//! initial_capacity = 256
//! ```

use serde::Deserialize;

use crate::ecs::GroupId;
use crate::error::{RootError, RootResult};

/// Tunables for an [`EngineRootCore`](crate::EngineRootCore).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RootConfig {
    /// Group used by `build_entity` when no group is named.
    pub standard_group: GroupId,
    /// Capacity reserved in every collection the first time it is created.
    pub initial_capacity: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            standard_group: GroupId::STANDARD,
            initial_capacity: 0,
        }
    }
}

impl RootConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Missing keys fall back to [`RootConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`RootError::InvalidConfig`] if the text is not valid TOML or a
    /// key has the wrong type.
    pub fn from_toml_str(text: &str) -> RootResult<Self> {
        toml::from_str(text).map_err(|e| RootError::InvalidConfig(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_default() {
        let config = RootConfig::from_toml_str("").unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = RootConfig::from_toml_str("standard_group = 7\ninitial_capacity = 64").unwrap();
        assert_eq!(config.standard_group, GroupId(7));
        assert_eq!(config.initial_capacity, 64);
    }

    #[test]
    fn test_bad_toml() {
        let err = RootConfig::from_toml_str("initial_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, RootError::InvalidConfig(_)));
    }
}
