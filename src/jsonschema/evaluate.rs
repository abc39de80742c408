//! Evaluation of JSON instances against JSON Schema documents.
//!
//! Supported keywords: `type`, `enum`, `const`, `required`, `properties`,
//! `additionalProperties`, `patternProperties`, `items`, `minItems`,
//! `maxItems`, `uniqueItems`, `minLength`, `maxLength`, `pattern`, `format`,
//! `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum`,
//! `minProperties`, `maxProperties`, `anyOf`, `allOf`, `oneOf`, `not` and
//! `$ref` to local definitions. Unknown keywords are ignored.

use std::fmt;
use std::sync::{LazyLock, RwLock};

use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use crate::error::{Result, VecorelError};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

static UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("uuid pattern is valid")
});

/// A single failed keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    /// JSON pointer to the offending part of the instance
    pub path: String,
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validates instances against one schema document.
///
/// Compiled patterns are cached, so one evaluator can be shared across
/// threads and rows.
pub struct Evaluator {
    root: Value,
    patterns: RwLock<FxHashMap<String, Regex>>,
}

impl Evaluator {
    /// Create an evaluator; the schema must be an object or a boolean
    pub fn new(root: Value) -> Result<Self> {
        if !root.is_object() && !root.is_boolean() {
            return Err(VecorelError::schema("A JSON Schema must be an object or a boolean"));
        }
        let evaluator = Self {
            root,
            patterns: RwLock::new(FxHashMap::default()),
        };
        evaluator.compile_patterns(&evaluator.root)?;
        Ok(evaluator)
    }

    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.root
    }

    /// All errors of the instance, empty when it is valid
    #[must_use]
    pub fn validate(&self, instance: &Value) -> Vec<SchemaError> {
        let mut errors = Vec::new();
        self.check(&self.root, instance, "", &mut errors, 0);
        errors
    }

    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }

    fn compile_patterns(&self, schema: &Value) -> Result<()> {
        match schema {
            Value::Object(map) => {
                if let Some(Value::String(pattern)) = map.get("pattern") {
                    self.regex(pattern)?;
                }
                if let Some(Value::Object(patterns)) = map.get("patternProperties") {
                    for pattern in patterns.keys() {
                        self.regex(pattern)?;
                    }
                }
                for (key, value) in map {
                    // `properties`, `$defs` and friends are maps of schemas
                    if !matches!(key.as_str(), "enum" | "const" | "default" | "examples") {
                        self.compile_patterns(value)?;
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.compile_patterns(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn regex(&self, pattern: &str) -> Result<Regex> {
        if let Ok(cache) = self.patterns.read() {
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }
        let regex = Regex::new(pattern)
            .map_err(|e| VecorelError::schema(format!("Invalid pattern '{pattern}': {e}")))?;
        if let Ok(mut cache) = self.patterns.write() {
            cache.insert(pattern.to_string(), regex.clone());
        }
        Ok(regex)
    }

    fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.root);
        }
        self.root.pointer(pointer)
    }

    fn check(&self, schema: &Value, instance: &Value, path: &str, errors: &mut Vec<SchemaError>, depth: usize) {
        let schema = match schema {
            Value::Bool(true) => return,
            Value::Bool(false) => {
                push(errors, path, "False schema does not allow any value".to_string());
                return;
            }
            Value::Object(schema) => schema,
            _ => return,
        };
        // Guard against reference cycles
        if depth > 64 {
            push(errors, path, "Schema nesting too deep".to_string());
            return;
        }

        if let Some(Value::String(reference)) = schema.get("$ref") {
            match self.resolve_ref(reference) {
                Some(target) => self.check(target, instance, path, errors, depth + 1),
                None => push(errors, path, format!("Unresolvable reference '{reference}'")),
            }
        }

        if let Some(expected) = schema.get("type") {
            if !matches_type(expected, instance) {
                push(errors, path, format!("{} is not of type {}", brief(instance), type_names(expected)));
                return;
            }
        }

        if let Some(Value::Array(values)) = schema.get("enum") {
            if !values.iter().any(|v| json_equal(v, instance)) {
                push(errors, path, format!("{} is not one of {}", brief(instance), Value::Array(values.clone())));
            }
        }
        if let Some(expected) = schema.get("const") {
            if !json_equal(expected, instance) {
                push(errors, path, format!("{} was expected", brief(expected)));
            }
        }

        match instance {
            Value::Number(_) => self.check_number(schema, instance, path, errors),
            Value::String(s) => self.check_string(schema, s, path, errors),
            Value::Array(items) => self.check_array(schema, items, path, errors, depth),
            Value::Object(object) => self.check_object(schema, object, path, errors, depth),
            _ => {}
        }

        self.check_combinators(schema, instance, path, errors, depth);
    }

    fn check_number(&self, schema: &Map<String, Value>, instance: &Value, path: &str, errors: &mut Vec<SchemaError>) {
        let Some(value) = instance.as_f64() else { return };
        if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
            if value < min {
                push(errors, path, format!("{instance} is less than the minimum of {min}"));
            }
        }
        if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
            if value > max {
                push(errors, path, format!("{instance} is greater than the maximum of {max}"));
            }
        }
        if let Some(min) = schema.get("exclusiveMinimum").and_then(Value::as_f64) {
            if value <= min {
                push(errors, path, format!("{instance} is less than or equal to the minimum of {min}"));
            }
        }
        if let Some(max) = schema.get("exclusiveMaximum").and_then(Value::as_f64) {
            if value >= max {
                push(errors, path, format!("{instance} is greater than or equal to the maximum of {max}"));
            }
        }
    }

    fn check_string(&self, schema: &Map<String, Value>, s: &str, path: &str, errors: &mut Vec<SchemaError>) {
        let length = s.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                push(errors, path, format!("'{s}' is too short (minimum length {min})"));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                push(errors, path, format!("'{s}' is too long (maximum length {max})"));
            }
        }
        if let Some(Value::String(pattern)) = schema.get("pattern") {
            match self.regex(pattern) {
                Ok(regex) if !regex.is_match(s) => {
                    push(errors, path, format!("'{s}' does not match '{pattern}'"));
                }
                Ok(_) => {}
                Err(e) => push(errors, path, e.to_string()),
            }
        }
        if let Some(Value::String(format)) = schema.get("format") {
            if !check_format(format, s) {
                push(errors, path, format!("'{s}' is not a valid {format}"));
            }
        }
    }

    fn check_array(&self, schema: &Map<String, Value>, items: &[Value], path: &str, errors: &mut Vec<SchemaError>, depth: usize) {
        let count = items.len() as u64;
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if count < min {
                push(errors, path, format!("Array has {count} items, expected at least {min}"));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if count > max {
                push(errors, path, format!("Array has {count} items, expected at most {max}"));
            }
        }
        if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            let duplicate = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[i + 1..].iter().any(|b| json_equal(a, b)));
            if duplicate {
                push(errors, path, "Array has non-unique elements".to_string());
            }
        }
        if let Some(item_schema) = schema.get("items") {
            for (i, item) in items.iter().enumerate() {
                self.check(item_schema, item, &format!("{path}/{i}"), errors, depth + 1);
            }
        }
    }

    fn check_object(&self, schema: &Map<String, Value>, object: &Map<String, Value>, path: &str, errors: &mut Vec<SchemaError>, depth: usize) {
        let count = object.len() as u64;
        if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
            if count < min {
                push(errors, path, format!("Object has {count} properties, expected at least {min}"));
            }
        }
        if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
            if count > max {
                push(errors, path, format!("Object has {count} properties, expected at most {max}"));
            }
        }
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    push(errors, path, format!("'{name}' is a required property"));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let patterns = schema.get("patternProperties").and_then(Value::as_object);
        let additional = schema.get("additionalProperties");

        for (key, value) in object {
            let child = format!("{path}/{}", escape_pointer(key));
            let mut matched = false;
            if let Some(prop_schema) = properties.and_then(|p| p.get(key)) {
                matched = true;
                self.check(prop_schema, value, &child, errors, depth + 1);
            }
            if let Some(patterns) = patterns {
                for (pattern, pattern_schema) in patterns {
                    if self.regex(pattern).is_ok_and(|r| r.is_match(key)) {
                        matched = true;
                        self.check(pattern_schema, value, &child, errors, depth + 1);
                    }
                }
            }
            if !matched {
                match additional {
                    Some(Value::Bool(false)) => {
                        push(errors, path, format!("Additional property '{key}' is not allowed"));
                    }
                    Some(extra @ Value::Object(_)) => self.check(extra, value, &child, errors, depth + 1),
                    _ => {}
                }
            }
        }
    }

    fn check_combinators(&self, schema: &Map<String, Value>, instance: &Value, path: &str, errors: &mut Vec<SchemaError>, depth: usize) {
        if let Some(Value::Array(all)) = schema.get("allOf") {
            for sub in all {
                self.check(sub, instance, path, errors, depth + 1);
            }
        }
        if let Some(Value::Array(any)) = schema.get("anyOf") {
            if !any.iter().any(|sub| self.passes(sub, instance, depth)) {
                push(errors, path, format!("{} is not valid under any of the given schemas", brief(instance)));
            }
        }
        if let Some(Value::Array(one)) = schema.get("oneOf") {
            let passing = one.iter().filter(|sub| self.passes(sub, instance, depth)).count();
            if passing != 1 {
                push(errors, path, format!("{} is valid under {passing} of the given schemas, expected exactly one", brief(instance)));
            }
        }
        if let Some(not) = schema.get("not") {
            if self.passes(not, instance, depth) {
                push(errors, path, format!("{} should not be valid under {not}", brief(instance)));
            }
        }
    }

    fn passes(&self, schema: &Value, instance: &Value, depth: usize) -> bool {
        let mut errors = Vec::new();
        self.check(schema, instance, "", &mut errors, depth + 1);
        errors.is_empty()
    }
}

fn push(errors: &mut Vec<SchemaError>, path: &str, message: String) {
    errors.push(SchemaError {
        path: path.to_string(),
        message,
    });
}

fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn brief(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 80 {
        format!("{}...", text.chars().take(77).collect::<String>())
    } else {
        text
    }
}

fn type_names(expected: &Value) -> String {
    match expected {
        Value::String(t) => format!("'{t}'"),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .map(|t| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn matches_type(expected: &Value, instance: &Value) -> bool {
    match expected {
        Value::String(t) => is_type(t, instance),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| is_type(t, instance)),
        _ => true,
    }
}

fn is_type(name: &str, instance: &Value) -> bool {
    match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(n) => n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0),
            _ => false,
        },
        _ => true,
    }
}

/// JSON equality where numbers compare by value (`1 == 1.0`)
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Check a string against a named format; unknown formats always pass
#[must_use]
pub fn check_format(format: &str, value: &str) -> bool {
    match format {
        "date" => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        "date-time" => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
        "email" => EMAIL.is_match(value),
        "uri" => url::Url::parse(value).is_ok(),
        "uuid" => UUID.is_match(value),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_country_code_reports_length_and_pattern() {
        let evaluator = Evaluator::new(json!({
            "type": "string",
            "minLength": 2,
            "maxLength": 2,
            "pattern": "^[A-Z]{2}$"
        }))
        .unwrap();
        assert!(evaluator.is_valid(&json!("DE")));
        let errors = evaluator.validate(&json!("DEE"));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("too long"));
        assert!(errors[1].message.contains("does not match"));
    }

    #[test]
    fn test_nested_paths_and_required() {
        let evaluator = Evaluator::new(json!({
            "type": "object",
            "required": ["properties"],
            "properties": {
                "properties": {
                    "type": "object",
                    "required": ["area"],
                    "properties": {"area": {"type": "number", "exclusiveMinimum": 0}}
                }
            }
        }))
        .unwrap();
        let errors = evaluator.validate(&json!({"properties": {"area": 0}}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "/properties/area");

        let errors = evaluator.validate(&json!({"properties": {}}));
        assert_eq!(errors[0].message, "'area' is a required property");
    }

    #[test]
    fn test_type_and_enum_with_null() {
        let evaluator = Evaluator::new(json!({"type": ["string", "null"], "enum": ["a", null]})).unwrap();
        assert!(evaluator.is_valid(&Value::Null));
        assert!(evaluator.is_valid(&json!("a")));
        assert_eq!(evaluator.validate(&json!("b")).len(), 1);
        assert_eq!(evaluator.validate(&json!(1)).len(), 1);
    }

    #[test]
    fn test_arrays() {
        let evaluator = Evaluator::new(json!({
            "type": "array",
            "items": {"type": "integer", "minimum": 0},
            "minItems": 1,
            "uniqueItems": true
        }))
        .unwrap();
        assert!(evaluator.is_valid(&json!([1, 2])));
        assert!(!evaluator.is_valid(&json!([])));
        assert!(!evaluator.is_valid(&json!([1, 1.0])));
        assert_eq!(evaluator.validate(&json!([1, -1]))[0].path, "/1");
    }

    #[test]
    fn test_refs_and_combinators() {
        let evaluator = Evaluator::new(json!({
            "$defs": {"positive": {"type": "number", "minimum": 0}},
            "anyOf": [{"$ref": "#/$defs/positive"}, {"type": "string"}]
        }))
        .unwrap();
        assert!(evaluator.is_valid(&json!(3)));
        assert!(evaluator.is_valid(&json!("x")));
        assert!(!evaluator.is_valid(&json!(-3)));
    }

    #[test]
    fn test_pattern_properties_and_additional() {
        let evaluator = Evaluator::new(json!({
            "type": "object",
            "patternProperties": {"^[a-z]+$": {"type": "integer"}},
            "additionalProperties": false
        }))
        .unwrap();
        assert!(evaluator.is_valid(&json!({"abc": 1})));
        assert!(!evaluator.is_valid(&json!({"abc": "x"})));
        assert!(!evaluator.is_valid(&json!({"ABC": 1})));
    }

    #[test]
    fn test_formats() {
        assert!(check_format("date", "2024-02-29"));
        assert!(!check_format("date", "2023-02-29"));
        assert!(check_format("date-time", "2024-01-01T12:00:00Z"));
        assert!(check_format("email", "a@example.com"));
        assert!(!check_format("uri", "not a uri"));
        assert!(check_format("uuid", "123e4567-e89b-12d3-a456-426614174000"));
        assert!(check_format("whatever", "x"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        assert!(Evaluator::new(json!({"pattern": "("})).is_err());
    }
}
