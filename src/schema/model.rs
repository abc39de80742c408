//! Typed model of Vecorel schema documents.
//!
//! Schemas are YAML/JSON documents of the shape
//! `{ $schema, required, properties, collection }`. Unknown keys are kept in
//! an `extra` bag so documents survive a round trip unchanged.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VecorelError};
use crate::types::DataType;

/// `additionalProperties` is either a flag or a schema for the extra values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<PropertySchema>),
}

/// Schema of a single property (or of a nested item/field)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySchema {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<PropertySchema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_properties: Option<IndexMap<String, PropertySchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_properties: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_types: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertySchema {
    /// Shorthand for a schema with just a type
    #[must_use]
    pub fn of(data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::default()
        }
    }

    /// The declared type, or a type error naming the property
    pub fn data_type(&self, name: &str) -> Result<DataType> {
        self.data_type.ok_or_else(|| {
            VecorelError::type_error(format!("Property '{name}' does not declare a type"))
        })
    }

    /// Enum constraints become dictionary-encoded columns
    #[must_use]
    pub fn is_enum(&self) -> bool {
        self.enum_values.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// An object with exactly one `patternProperties` entry is a map
    #[must_use]
    pub fn map_value_schema(&self) -> Option<&PropertySchema> {
        match &self.pattern_properties {
            Some(patterns) if patterns.len() == 1 => patterns.values().next(),
            _ => None,
        }
    }

    /// Whether a nested object field is required
    #[must_use]
    pub fn requires(&self, field: &str) -> bool {
        self.required
            .as_ref()
            .is_some_and(|r| r.iter().any(|f| f == field))
    }
}

/// A schema document: core schema, extension or inline custom schema
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VecorelSchema {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, PropertySchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub collection: IndexMap<String, bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VecorelSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a schema from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| VecorelError::schema(format!("Invalid schema document: {e}")))
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.properties.is_empty() && self.collection.is_empty()
    }

    #[must_use]
    pub fn is_required(&self, property: &str) -> bool {
        self.required.iter().any(|p| p == property)
    }

    /// Whether the property is stored once per collection instead of per row
    #[must_use]
    pub fn is_collection_scoped(&self, property: &str) -> bool {
        self.collection.get(property).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.properties.get(name)
    }

    /// Merge `other` on top of `self`.
    ///
    /// `required` is a union preserving first occurrence order, `properties`
    /// and `collection` take the last writer for a given name.
    pub fn merge(&mut self, other: &VecorelSchema) {
        for name in &other.required {
            if !self.is_required(name) {
                self.required.push(name.clone());
            }
        }
        for (name, prop) in &other.properties {
            self.properties.insert(name.clone(), prop.clone());
        }
        for (name, scoped) in &other.collection {
            self.collection.insert(name.clone(), *scoped);
        }
        if self.schema.is_none() {
            self.schema.clone_from(&other.schema);
        }
        for (key, value) in &other.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn merged(mut self, other: &VecorelSchema) -> Self {
        self.merge(other);
        self
    }

    /// Rename a property everywhere it is referenced
    pub fn rename_property(&mut self, old: &str, new: &str) {
        for name in &mut self.required {
            if name == old {
                *name = new.to_string();
            }
        }
        if let Some(index) = self.properties.get_index_of(old) {
            if let Some((_, prop)) = self.properties.shift_remove_index(index) {
                self.properties.shift_insert(index, new.to_string(), prop);
            }
        }
        if let Some(index) = self.collection.get_index_of(old) {
            if let Some((_, scoped)) = self.collection.shift_remove_index(index) {
                self.collection.shift_insert(index, new.to_string(), scoped);
            }
        }
    }
}
