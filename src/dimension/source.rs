//! Content dimension configuration and the allowed dimension subspace.

use super::point::{DimensionSpacePoint, DimensionSpacePointSet};
use crate::domain::errors::ContentRepositoryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Declarative configuration of one content dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDimensionConfig {
    pub id: String,
    #[serde(default)]
    pub values: Vec<DimensionValueConfig>,
}

/// One value of a dimension with its specializations.
///
/// `constraints` maps another dimension id to allowed values of that dimension
/// (`'*'` being the fallback) when this value is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionValueConfig {
    pub value: String,
    #[serde(default)]
    pub specializations: Vec<DimensionValueConfig>,
    #[serde(default)]
    pub constraints: BTreeMap<String, BTreeMap<String, bool>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentDimensionValue {
    pub value: String,
    pub depth: u32,
    pub generalization: Option<String>,
    pub constraints: BTreeMap<String, BTreeMap<String, bool>>,
}

impl ContentDimensionValue {
    /// Whether this value may be combined with `value` of `dimension_id`.
    pub fn allows(&self, dimension_id: &str, value: &str) -> bool {
        match self.constraints.get(dimension_id) {
            Some(rules) => rules
                .get(value)
                .or_else(|| rules.get("*"))
                .copied()
                .unwrap_or(true),
            None => true,
        }
    }
}

/// A dimension with its values flattened depth-first in configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDimension {
    id: String,
    values: Vec<ContentDimensionValue>,
    index: HashMap<String, usize>,
}

impl ContentDimension {
    pub fn from_config(config: &ContentDimensionConfig) -> Result<Self, ContentRepositoryError> {
        if config.values.is_empty() {
            return Err(ContentRepositoryError::InvalidConfiguration {
                message: format!("dimension '{}' declares no values", config.id),
            });
        }
        let mut dimension = Self {
            id: config.id.clone(),
            values: Vec::new(),
            index: HashMap::new(),
        };
        for value in &config.values {
            dimension.collect(value, 0, None)?;
        }
        Ok(dimension)
    }

    fn collect(
        &mut self,
        config: &DimensionValueConfig,
        depth: u32,
        generalization: Option<&str>,
    ) -> Result<(), ContentRepositoryError> {
        if self.index.contains_key(&config.value) {
            return Err(ContentRepositoryError::InvalidConfiguration {
                message: format!(
                    "dimension '{}' declares value '{}' more than once",
                    self.id, config.value
                ),
            });
        }
        self.index.insert(config.value.clone(), self.values.len());
        self.values.push(ContentDimensionValue {
            value: config.value.clone(),
            depth,
            generalization: generalization.map(str::to_string),
            constraints: config.constraints.clone(),
        });
        for specialization in &config.specializations {
            self.collect(specialization, depth + 1, Some(&config.value))?;
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn values(&self) -> &[ContentDimensionValue] {
        &self.values
    }

    pub fn value(&self, value: &str) -> Option<&ContentDimensionValue> {
        self.index.get(value).map(|i| &self.values[*i])
    }

    pub fn max_depth(&self) -> u32 {
        self.values.iter().map(|v| v.depth).max().unwrap_or(0)
    }

    /// True if `general` equals `specific` or is one of its ancestors.
    pub fn is_generalization_or_same(&self, general: &str, specific: &str) -> bool {
        let mut current = Some(specific);
        while let Some(value) = current {
            if value == general {
                return true;
            }
            current = self
                .value(value)
                .and_then(|v| v.generalization.as_deref());
        }
        false
    }
}

/// All configured dimensions, in priority order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDimensionSource {
    dimensions: Vec<ContentDimension>,
}

impl ContentDimensionSource {
    pub fn from_configs(configs: &[ContentDimensionConfig]) -> Result<Self, ContentRepositoryError> {
        let mut dimensions: Vec<ContentDimension> = Vec::with_capacity(configs.len());
        for config in configs {
            if dimensions.iter().any(|d| d.id == config.id) {
                return Err(ContentRepositoryError::InvalidConfiguration {
                    message: format!("dimension '{}' is declared more than once", config.id),
                });
            }
            dimensions.push(ContentDimension::from_config(config)?);
        }
        Ok(Self { dimensions })
    }

    pub fn dimensions(&self) -> &[ContentDimension] {
        &self.dimensions
    }

    pub fn dimension(&self, id: &str) -> Option<&ContentDimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    /// Allowed combinations in enumeration order: the cartesian product over
    /// dimensions in priority order, values depth-first, filtered by constraints.
    pub fn allowed_combinations(&self) -> Vec<DimensionSpacePoint> {
        let mut combinations: Vec<Vec<&ContentDimensionValue>> = vec![Vec::new()];
        for dimension in &self.dimensions {
            let mut next = Vec::new();
            for partial in &combinations {
                for value in &dimension.values {
                    let mut extended = partial.clone();
                    extended.push(value);
                    next.push(extended);
                }
            }
            combinations = next;
        }
        combinations
            .into_iter()
            .filter(|values| self.satisfies_constraints(values))
            .map(|values| {
                DimensionSpacePoint::new(
                    self.dimensions
                        .iter()
                        .zip(values)
                        .map(|(d, v)| (d.id.clone(), v.value.clone())),
                )
            })
            .collect()
    }

    pub fn allowed_subspace(&self) -> DimensionSpacePointSet {
        self.allowed_combinations().into_iter().collect()
    }

    fn satisfies_constraints(&self, values: &[&ContentDimensionValue]) -> bool {
        values.iter().all(|value| {
            self.dimensions
                .iter()
                .zip(values)
                .all(|(other_dimension, other_value)| {
                    value.allows(&other_dimension.id, &other_value.value)
                })
        })
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
