//! Generation of JSON Schema documents from Vecorel schemas.

use serde_json::{json, Map, Value};

use crate::jsonschema::JSON_SCHEMA_DIALECT;
use crate::schema::{AdditionalProperties, PropertySchema, VecorelSchema};
use crate::types::DataType;

/// Properties that live at the top level of a GeoJSON Feature
const TOP_LEVEL: [&str; 4] = ["id", "geometry", "bbox", "collection"];

/// Converts Vecorel property schemas into JSON Schema.
///
/// The JSON Schema for each abstract type can be replaced by an external
/// data types document whose `$defs` are keyed by type name.
#[derive(Debug, Clone, Default)]
pub struct Generator {
    datatypes: Option<Map<String, Value>>,
    id: Option<String>,
}

impl Generator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the `$defs` (or `definitions`) of a data types document
    #[must_use]
    pub fn with_datatypes(mut self, document: &Value) -> Self {
        self.datatypes = document
            .get("$defs")
            .or_else(|| document.get("definitions"))
            .and_then(Value::as_object)
            .cloned();
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn base(&self, data_type: DataType) -> Map<String, Value> {
        if let Some(def) = self
            .datatypes
            .as_ref()
            .and_then(|defs| defs.get(data_type.as_str()))
            .and_then(Value::as_object)
        {
            return def.clone();
        }

        let value = match data_type {
            DataType::Boolean => json!({"type": "boolean"}),
            DataType::Float | DataType::Double => json!({"type": "number"}),
            DataType::String => json!({"type": "string"}),
            DataType::Binary => json!({"type": "string", "contentEncoding": "base16"}),
            DataType::Date => json!({"type": "string", "format": "date"}),
            DataType::DateTime => json!({"type": "string", "format": "date-time"}),
            DataType::Array => json!({"type": "array"}),
            DataType::Object => json!({"type": "object"}),
            DataType::Geometry => json!({
                "type": "object",
                "required": ["type"],
                "properties": {"type": {"type": "string"}}
            }),
            DataType::BoundingBox => json!({
                "type": "array",
                "minItems": 4,
                "maxItems": 4,
                "items": {"type": "number"}
            }),
            integer => {
                let (min, max) = integer.integer_range().unwrap_or((i128::from(i64::MIN), i128::from(i64::MAX)));
                json!({"type": "integer", "minimum": int_value(min), "maximum": int_value(max)})
            }
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    /// JSON Schema for a single property; nullable schemas also accept `null`
    #[must_use]
    pub fn property(&self, prop: &PropertySchema, nullable: bool) -> Value {
        let mut out = match prop.data_type {
            Some(data_type) => self.base(data_type),
            None => Map::new(),
        };

        tighten(&mut out, "minimum", prop.minimum, f64::max);
        tighten(&mut out, "maximum", prop.maximum, f64::min);
        tighten(&mut out, "exclusiveMinimum", prop.exclusive_minimum, f64::max);
        tighten(&mut out, "exclusiveMaximum", prop.exclusive_maximum, f64::min);

        set(&mut out, "minLength", prop.min_length.map(Value::from));
        set(&mut out, "maxLength", prop.max_length.map(Value::from));
        set(&mut out, "pattern", prop.pattern.clone().map(Value::from));
        set(&mut out, "format", prop.format.clone().map(Value::from));
        set(&mut out, "enum", prop.enum_values.clone().map(Value::Array));

        set(&mut out, "minItems", prop.min_items.map(Value::from));
        set(&mut out, "maxItems", prop.max_items.map(Value::from));
        set(&mut out, "uniqueItems", prop.unique_items.map(Value::from));
        if let Some(items) = &prop.items {
            out.insert("items".into(), self.property(items, false));
        }

        if let Some(properties) = &prop.properties {
            let fields = properties
                .iter()
                .map(|(name, field)| (name.clone(), self.property(field, !prop.requires(name))))
                .collect::<Map<_, _>>();
            out.insert("properties".into(), Value::Object(fields));
        }
        if let Some(required) = &prop.required {
            out.insert("required".into(), json!(required));
        }
        if let Some(patterns) = &prop.pattern_properties {
            let patterns = patterns
                .iter()
                .map(|(pattern, value)| (pattern.clone(), self.property(value, true)))
                .collect::<Map<_, _>>();
            out.insert("patternProperties".into(), Value::Object(patterns));
        }
        match &prop.additional_properties {
            Some(AdditionalProperties::Allowed(allowed)) => {
                out.insert("additionalProperties".into(), Value::Bool(*allowed));
            }
            Some(AdditionalProperties::Schema(schema)) => {
                out.insert("additionalProperties".into(), self.property(schema, true));
            }
            None => {}
        }
        set(&mut out, "minProperties", prop.min_properties.map(Value::from));
        set(&mut out, "maxProperties", prop.max_properties.map(Value::from));

        if let Some(types) = &prop.geometry_types {
            let names: Vec<Value> = types
                .iter()
                .map(|t| Value::from(t.trim_end_matches(" Z")))
                .collect();
            out.insert(
                "properties".into(),
                json!({"type": {"type": "string", "enum": names}}),
            );
        }

        if let Some(description) = &prop.description {
            out.insert("description".into(), Value::from(description.clone()));
        }

        if nullable {
            make_nullable(&mut out);
        }
        Value::Object(out)
    }

    /// JSON Schema for a GeoJSON Feature carrying the given properties
    #[must_use]
    pub fn feature(&self, schema: &VecorelSchema) -> Value {
        let mut top = Map::new();
        top.insert("type".into(), json!({"const": "Feature"}));
        let mut top_required = vec![json!("type"), json!("geometry"), json!("properties")];

        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, prop) in &schema.properties {
            let is_required = schema.is_required(name);
            if TOP_LEVEL.contains(&name.as_str()) {
                top.insert(name.clone(), self.property(prop, !is_required));
                if is_required && name == "id" {
                    top_required.push(json!("id"));
                }
            } else {
                properties.insert(name.clone(), self.property(prop, !is_required));
                if is_required {
                    required.push(json!(name));
                }
            }
        }
        top.entry("geometry")
            .or_insert_with(|| json!({"type": ["object", "null"]}));

        top.insert(
            "properties".into(),
            json!({
                "type": "object",
                "required": required,
                "properties": properties
            }),
        );

        let mut out = Map::new();
        out.insert("$schema".into(), json!(JSON_SCHEMA_DIALECT));
        if let Some(id) = &self.id {
            out.insert("$id".into(), json!(id));
        }
        out.insert("type".into(), json!("object"));
        out.insert("required".into(), Value::Array(top_required));
        out.insert("properties".into(), Value::Object(top));
        Value::Object(out)
    }
}

fn int_value(v: i128) -> Value {
    i64::try_from(v)
        .map(Value::from)
        .or_else(|_| u64::try_from(v).map(Value::from))
        .unwrap_or(Value::Null)
}

fn set(out: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        out.insert(key.to_string(), value);
    }
}

/// Apply a declared numeric bound, keeping the stricter one if the type
/// already implies a bound
fn tighten(out: &mut Map<String, Value>, key: &str, declared: Option<f64>, pick: fn(f64, f64) -> f64) {
    let Some(declared) = declared else { return };
    let bound = match out.get(key).and_then(Value::as_f64) {
        Some(existing) => pick(existing, declared),
        None => declared,
    };
    if out.get(key).and_then(Value::as_f64) != Some(bound) {
        out.insert(key.to_string(), number(bound));
    }
}

fn number(v: f64) -> Value {
    if v.fract() == 0.0 && v.abs() < 9.0e15 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

fn make_nullable(out: &mut Map<String, Value>) {
    let nullable_type = match out.get("type") {
        Some(Value::String(t)) => Some(json!([t, "null"])),
        Some(Value::Array(types)) if !types.iter().any(|t| t == "null") => {
            let mut types = types.clone();
            types.push(json!("null"));
            Some(Value::Array(types))
        }
        _ => None,
    };
    if let Some(t) = nullable_type {
        out.insert("type".into(), t);
    }
    if let Some(Value::Array(values)) = out.get_mut("enum") {
        if !values.contains(&Value::Null) {
            values.push(Value::Null);
        }
    }
}

/// JSON Schema for a single property with the built-in type mapping
#[must_use]
pub fn property_schema(prop: &PropertySchema, nullable: bool) -> Value {
    Generator::new().property(prop, nullable)
}

/// JSON Schema for a Feature with the built-in type mapping
#[must_use]
pub fn feature_schema(schema: &VecorelSchema) -> Value {
    Generator::new().feature(schema)
}
