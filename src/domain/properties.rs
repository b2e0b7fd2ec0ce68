//! Property and reference values.
//!
//! `PropertyValuesToWrite` is the caller-facing form: plain JSON values, with
//! `null` meaning "unset this property". `SerializedPropertyValues` is what
//! events carry: every value paired with its declared type name.

use crate::domain::types::{NodeAggregateId, PropertyName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValuesToWrite(BTreeMap<PropertyName, Value>);

impl PropertyValuesToWrite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.0.insert(PropertyName::from(name), value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Names whose value is `null`.
    pub fn names_to_unset(&self) -> Vec<PropertyName> {
        self.0
            .iter()
            .filter(|(_, v)| v.is_null())
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedPropertyValue {
    pub value: Value,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl SerializedPropertyValue {
    pub fn new(value: Value, type_name: &str) -> Self {
        Self {
            value,
            type_name: type_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedPropertyValues(BTreeMap<PropertyName, SerializedPropertyValue>);

impl SerializedPropertyValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: SerializedPropertyValue) -> Self {
        self.0.insert(PropertyName::from(name), value);
        self
    }

    pub fn get(&self, name: &PropertyName) -> Option<&SerializedPropertyValue> {
        self.0.get(name)
    }

    /// Plain value of a property, if set.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.0.get(&PropertyName::from(name)).map(|v| &v.value)
    }

    pub fn contains(&self, name: &PropertyName) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: PropertyName, value: SerializedPropertyValue) {
        self.0.insert(name, value);
    }

    pub fn remove(&mut self, name: &PropertyName) -> Option<SerializedPropertyValue> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyName, &SerializedPropertyValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Values of `other` override values of `self`.
    pub fn merge(&self, other: &Self) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Entries whose value is `null` are dropped.
    pub fn without_nulls(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, v)| !v.value.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// One outgoing reference, optionally carrying properties of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReference {
    pub target_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub properties: SerializedPropertyValues,
}

impl NodeReference {
    pub fn to(target: NodeAggregateId) -> Self {
        Self {
            target_node_aggregate_id: target,
            properties: SerializedPropertyValues::new(),
        }
    }
}
