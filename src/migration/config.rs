//! Declarative migration configuration as read from YAML.

use crate::domain::errors::ContentRepositoryError;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfiguration {
    /// Free text describing what the migration does.
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub warnings: Option<String>,
    pub migration: Vec<MigrationStepConfiguration>,
}

/// One step: filters select what the transformations apply to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MigrationStepConfiguration {
    #[serde(default)]
    pub filters: Vec<ComponentConfiguration>,
    pub transformations: Vec<ComponentConfiguration>,
}

/// A filter or transformation reference: registry type name plus its settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ComponentConfiguration {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_settings")]
    pub settings: serde_yaml::Value,
}

fn empty_settings() -> serde_yaml::Value {
    serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
}

impl MigrationConfiguration {
    pub fn from_yaml(yaml: &str) -> Result<Self, ContentRepositoryError> {
        serde_yaml::from_str(yaml).map_err(|e| ContentRepositoryError::InvalidConfiguration {
            message: format!("invalid migration: {}", e),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ContentRepositoryError> {
        let content = std::fs::read_to_string(path).map_err(|e| ContentRepositoryError::InvalidConfiguration {
            message: format!("cannot read migration {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
