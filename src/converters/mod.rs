//! Converters turn third-party datasets into Vecorel GeoParquet files.
//!
//! A converter is mostly data: a [`ConverterConfig`] naming the sources,
//! the column mapping, row filters, constant additions and the schemas of the
//! output. Behaviour that does not fit the config goes into the optional
//! callbacks of the [`Converter`] trait. The [`pipeline`] runs both in a fixed
//! order.

pub mod archive;
pub mod geojson;
pub mod pipeline;

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, VecorelError};
use crate::frame::Dataset;
use crate::schema::VecorelSchema;

pub use pipeline::{convert, ConvertOptions};

/// An organisation involved in producing the source data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Provider {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
}

/// Row filter applied to a source column before it is renamed
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    Equals(Value),
    NotEquals(Value),
    OneOf(Vec<Value>),
    NotNull,
}

impl ColumnFilter {
    #[must_use]
    pub fn keep(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::NotEquals(expected) => value != expected,
            Self::OneOf(values) => values.contains(value),
            Self::NotNull => !value.is_null(),
        }
    }
}

impl fmt::Display for ColumnFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => write!(f, "== {v}"),
            Self::NotEquals(v) => write!(f, "!= {v}"),
            Self::OneOf(values) => write!(
                f,
                "in [{}]",
                values.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
            ),
            Self::NotNull => f.write_str("is not null"),
        }
    }
}

/// Declarative description of a converter
#[derive(Debug, Clone, Default)]
pub struct ConverterConfig {
    /// Registry name, also the collection id of the output
    pub id: String,
    pub short_name: String,
    pub title: String,
    pub description: String,
    pub license: Option<String>,
    pub attribution: Option<String>,
    pub providers: Vec<Provider>,
    /// Default input tokens (`PATH` or `PATH|MEMBER1,MEMBER2`)
    pub sources: Vec<String>,
    /// Alternative source lists selected with `--variant`
    pub variants: IndexMap<String, Vec<String>>,
    /// Source column to output property; empty keeps every column
    pub columns: IndexMap<String, String>,
    pub column_filters: IndexMap<String, ColumnFilter>,
    /// Constant properties added to every row
    pub column_additions: IndexMap<String, Value>,
    /// Extension schema URIs the output declares
    pub extensions: Vec<String>,
    /// Custom schema for properties no declared schema covers
    pub missing_schemas: VecorelSchema,
    /// Use the row number as `id`
    pub index_as_id: bool,
}

impl ConverterConfig {
    /// Sources for a variant, or the default sources
    pub fn sources_for(&self, variant: Option<&str>) -> Result<&[String]> {
        match variant {
            None => Ok(&self.sources),
            Some(name) => self.variants.get(name).map(Vec::as_slice).ok_or_else(|| {
                VecorelError::Converter(format!(
                    "Converter '{}' has no variant '{name}', available: {}",
                    self.id,
                    self.variants.keys().cloned().collect::<Vec<_>>().join(", ")
                ))
            }),
        }
    }
}

/// A converter: its config plus optional hooks into the pipeline.
///
/// Hooks run in this order: `layer_filter` while collecting input files,
/// `file_migration` per file, `migrate` on the concatenated rows before the
/// column mapping, and `post_migrate` right before writing.
pub trait Converter: Send + Sync {
    fn config(&self) -> &ConverterConfig;

    /// Whether a file found inside a source directory should be read
    fn layer_filter(&self, _layer: &str, _source: &str) -> bool {
        true
    }

    fn file_migration(&self, dataset: Dataset, _path: &Path, _source: &str) -> Result<Dataset> {
        Ok(dataset)
    }

    fn migrate(&self, dataset: Dataset) -> Result<Dataset> {
        Ok(dataset)
    }

    fn post_migrate(&self, dataset: Dataset) -> Result<Dataset> {
        Ok(dataset)
    }
}

/// All available converters
#[must_use]
pub fn registry() -> Vec<Box<dyn Converter>> {
    vec![Box::new(geojson::GeoJsonConverter::new())]
}

/// Look up a converter by id (case-insensitive)
pub fn get_converter(name: &str) -> Result<Box<dyn Converter>> {
    registry()
        .into_iter()
        .find(|c| c.config().id.eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            VecorelError::Converter(format!(
                "Unknown converter '{name}', available: {}",
                registry()
                    .iter()
                    .map(|c| c.config().id.clone())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        assert!(get_converter("GeoJSON").is_ok());
        let err = get_converter("nope").err().unwrap();
        assert!(err.to_string().contains("geojson"));
    }

    #[test]
    fn test_filters() {
        assert!(ColumnFilter::Equals(json!("crop")).keep(&json!("crop")));
        assert!(!ColumnFilter::NotNull.keep(&Value::Null));
        assert!(ColumnFilter::OneOf(vec![json!(1), json!(2)]).keep(&json!(2)));
        assert_eq!(ColumnFilter::NotEquals(json!(0)).to_string(), "!= 0");
    }

    #[test]
    fn test_variants() {
        let mut config = ConverterConfig {
            id: "x".into(),
            sources: vec!["a.json".into()],
            ..ConverterConfig::default()
        };
        config.variants.insert("2023".into(), vec!["b.json".into()]);
        assert_eq!(config.sources_for(None).unwrap(), ["a.json".to_string()]);
        assert_eq!(config.sources_for(Some("2023")).unwrap(), ["b.json".to_string()]);
        assert!(config.sources_for(Some("1999")).is_err());
    }
}
