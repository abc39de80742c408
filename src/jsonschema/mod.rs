//! JSON Schema support for the feature encoding.
//!
//! [`generate`] turns a resolved Vecorel schema into a JSON Schema
//! (draft 2020-12) describing a GeoJSON Feature. [`Evaluator`] checks JSON
//! instances against such documents; it implements the subset of keywords the
//! generator emits plus what the bundled metaschema needs.

pub mod evaluate;
pub mod generate;

pub use evaluate::{Evaluator, SchemaError};
pub use generate::{feature_schema, property_schema, Generator};

/// Dialect of every generated document
pub const JSON_SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// Bundled metaschema for Vecorel schema documents
pub const METASCHEMA: &str = include_str!("../schema/metaschema.json");
