use crate::dimension::{ContentDimensionConfig, ContentDimensionSource};
use crate::domain::services::ContentRepositoryServices;
use crate::node_type::{NodeTypeDeclaration, NodeTypeManager};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CONTENTGRAPH_CONFIG";

/// Repository configuration: where events live, the dimension space and the node types.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub dimensions: Vec<ContentDimensionConfig>,
    #[serde(default)]
    pub node_types: BTreeMap<String, NodeTypeDeclaration>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for the event logs. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl RepositoryConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml).context("Failed to parse config as YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `explicit`, else from `CONTENTGRAPH_CONFIG`, else the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        self.dimension_source()?;
        self.node_type_manager()?;
        Ok(())
    }

    pub fn dimension_source(&self) -> Result<ContentDimensionSource> {
        ContentDimensionSource::from_configs(&self.dimensions).context("Invalid dimension configuration")
    }

    pub fn node_type_manager(&self) -> Result<NodeTypeManager> {
        NodeTypeManager::from_declarations(&self.node_types).context("Invalid node type configuration")
    }

    pub fn services(&self) -> Result<ContentRepositoryServices> {
        Ok(ContentRepositoryServices::new(
            &self.dimension_source()?,
            self.node_type_manager()?,
        ))
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().context("Could not determine the data directory")?;
        Ok(data_dir.join("contentgraph"))
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
