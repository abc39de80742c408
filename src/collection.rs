//! In-memory model of a Collection.
//!
//! A collection is a keyed bundle stored in the GeoParquet `collection`
//! metadata blob and at the top level of a GeoJSON FeatureCollection. It
//! always carries `schemas` (collection id -> schema URIs) when non-empty, may
//! carry an inline `schemas:custom` document, and otherwise holds free-form
//! metadata and dehydrated collection-level property values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, VecorelError};
use crate::schema::{resolve, ResolveOptions, ResolvedSchemas, SchemaStore, Schemas, VecorelSchema};

/// Key of the collection id -> schema URIs mapping
pub const SCHEMAS_KEY: &str = "schemas";
/// Key of the inline custom schema
pub const CUSTOM_SCHEMAS_KEY: &str = "schemas:custom";
/// Key of per-collection property values that differ between collections
pub const COLLECTIONS_KEY: &str = "collections";
/// Reserved column naming the collection a row belongs to
pub const COLLECTION_COLUMN: &str = "collection";

const RESERVED_KEYS: [&str; 3] = [SCHEMAS_KEY, CUSTOM_SCHEMAS_KEY, COLLECTIONS_KEY];

/// Collection metadata with typed accessors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection(Map<String, Value>);

impl Collection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection with a single id using the given schemas
    #[must_use]
    pub fn with_schemas(schemas: &Schemas) -> Self {
        let mut collection = Self::new();
        collection.set_schemas(schemas);
        collection
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(VecorelError::schema(format!(
                "Collection must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Free-form metadata: everything except the reserved keys
    pub fn metadata(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0
            .iter()
            .filter(|(k, _)| !RESERVED_KEYS.contains(&k.as_str()))
    }

    pub fn get_schemas(&self) -> Result<Schemas> {
        match self.0.get(SCHEMAS_KEY) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                VecorelError::schema(format!("Invalid '{SCHEMAS_KEY}' in collection: {e}"))
            }),
            None => Ok(Schemas::new()),
        }
    }

    pub fn set_schemas(&mut self, schemas: &Schemas) {
        // Schemas only hold strings, serialising them cannot fail
        let value = serde_json::to_value(schemas).unwrap_or(Value::Null);
        self.0.insert(SCHEMAS_KEY.to_string(), value);
    }

    /// The inline custom schema, empty if none is present
    pub fn get_custom_schemas(&self) -> Result<VecorelSchema> {
        match self.0.get(CUSTOM_SCHEMAS_KEY) {
            Some(value) => VecorelSchema::from_value(value.clone())
                .map_err(|e| e.context(format!("Invalid '{CUSTOM_SCHEMAS_KEY}' in collection"))),
            None => Ok(VecorelSchema::new()),
        }
    }

    pub fn set_custom_schemas(&mut self, schema: &VecorelSchema) -> Result<()> {
        if schema.is_empty() {
            self.0.shift_remove(CUSTOM_SCHEMAS_KEY);
        } else {
            self.0
                .insert(CUSTOM_SCHEMAS_KEY.to_string(), schema.to_value()?);
        }
        Ok(())
    }

    /// Collection ids declared in `schemas`
    pub fn collection_ids(&self) -> Result<Vec<String>> {
        Ok(self.get_schemas()?.ids().map(str::to_string).collect())
    }

    /// Value of a collection-level property for one collection id.
    ///
    /// A per-collection value under `collections.{id}` wins over a value shared
    /// by all collections at the top level.
    #[must_use]
    pub fn property_value(&self, collection_id: Option<&str>, property: &str) -> Option<&Value> {
        collection_id
            .and_then(|id| self.0.get(COLLECTIONS_KEY)?.get(id)?.get(property))
            .or_else(|| self.0.get(property))
    }

    /// Store a collection-level property value, shared or per collection
    pub fn set_property_value(&mut self, collection_id: Option<&str>, property: &str, value: Value) {
        match collection_id {
            None => {
                self.0.insert(property.to_string(), value);
            }
            Some(id) => {
                let collections = self
                    .0
                    .entry(COLLECTIONS_KEY)
                    .or_insert_with(|| Value::Object(Map::new()));
                if !collections.is_object() {
                    *collections = Value::Object(Map::new());
                }
                if let Value::Object(collections) = collections {
                    let entry = collections
                        .entry(id)
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Value::Object(values) = entry {
                        values.insert(property.to_string(), value);
                    }
                }
            }
        }
    }

    /// Remove a property value from the top level and every collection
    pub fn remove_property_value(&mut self, property: &str) {
        self.0.shift_remove(property);
        if let Some(Value::Object(collections)) = self.0.get_mut(COLLECTIONS_KEY) {
            for values in collections.values_mut() {
                if let Value::Object(values) = values {
                    values.shift_remove(property);
                }
            }
            collections.retain(|_, v| v.as_object().is_some_and(|o| !o.is_empty()));
            if collections.is_empty() {
                self.0.shift_remove(COLLECTIONS_KEY);
            }
        }
    }

    /// Rename a property value everywhere it is stored
    pub fn rename_property_value(&mut self, old: &str, new: &str) {
        if let Some(value) = self.0.shift_remove(old) {
            self.0.insert(new.to_string(), value);
        }
        if let Some(Value::Object(collections)) = self.0.get_mut(COLLECTIONS_KEY) {
            for values in collections.values_mut() {
                if let Some(value) = values.as_object_mut().and_then(|v| v.shift_remove(old)) {
                    if let Some(values) = values.as_object_mut() {
                        values.insert(new.to_string(), value);
                    }
                }
            }
        }
    }

    /// Resolve the declared schemas, merging the custom schema last
    pub fn resolve(&self, store: &SchemaStore, options: ResolveOptions) -> Result<ResolvedSchemas> {
        let custom = self.get_custom_schemas()?;
        let custom = (!custom.is_empty()).then_some(&custom);
        resolve(store, &self.get_schemas()?, custom, options)
    }

    /// Check the invariant that a non-empty collection declares its schemas
    pub fn check(&self) -> Result<()> {
        if !self.is_empty() && !self.contains_key(SCHEMAS_KEY) {
            return Err(VecorelError::schema(format!(
                "Collection is missing the '{SCHEMAS_KEY}' key"
            )));
        }
        Ok(())
    }
}
