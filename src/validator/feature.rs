//! Validation of GeoJSON features through generated JSON Schemas.

use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::collection::{Collection, COLLECTION_COLUMN};
use crate::config::ReadOptions;
use crate::encoding::geojson::read_features;
use crate::error::Result;
use crate::frame::BBOX_COLUMN;
use crate::geometry::ops::invalidity_reason;
use crate::geometry::{geojson, BBox};
use crate::jsonschema::{Evaluator, Generator};
use crate::schema::{ResolvedSchemas, SchemaStore};

use super::{resolve_collection, without_unsupported_unique, Report, ValidatorConfig};

/// Validate every feature of a GeoJSON file or per-feature directory
pub fn validate(
    path: &Path,
    config: &ValidatorConfig,
    store: &SchemaStore,
    report: &mut Report,
) -> Result<()> {
    let options = ReadOptions {
        num: config.num,
        ..ReadOptions::default()
    };
    let (collection, features) = read_features(path, &options)?;
    let Some(resolved) = resolve_collection(&collection, config, store, report) else {
        return Ok(());
    };
    let evaluators = feature_evaluators(&resolved, report)?;
    let default_id = (evaluators.len() == 1)
        .then(|| evaluators.keys().next().cloned())
        .flatten();

    for (index, feature) in features.iter().enumerate() {
        let label = feature_label(feature, index);
        let id = feature_collection(feature).or(default_id.as_deref());
        let Some(evaluator) = id.and_then(|id| evaluators.get(id)) else {
            report.error(format!(
                "Feature {label}: collection '{}' is not declared",
                id.unwrap_or_default()
            ));
            continue;
        };

        let hydrated = hydrate_feature(feature, &collection, id, &resolved);
        for error in evaluator.validate(&hydrated) {
            report.error(format!("Feature {label}: {error}"));
        }
        if config.data {
            check_geometry(&hydrated, &label, report);
        }
    }
    Ok(())
}

fn feature_evaluators(
    resolved: &ResolvedSchemas,
    report: &mut Report,
) -> Result<IndexMap<String, Evaluator>> {
    let generator = Generator::new();
    resolved
        .iter()
        .map(|(id, schema)| {
            let schema = without_unsupported_unique(schema, report);
            let evaluator = Evaluator::new(generator.feature(&schema))?;
            Ok((id.to_string(), evaluator))
        })
        .collect()
}

fn feature_label(feature: &Value, index: usize) -> String {
    match feature.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => format!("#{index}"),
    }
}

/// Collection id of a feature: top-level member first, then the property
fn feature_collection(feature: &Value) -> Option<&str> {
    feature
        .get(COLLECTION_COLUMN)
        .or_else(|| feature.get("properties")?.get(COLLECTION_COLUMN))
        .and_then(Value::as_str)
}

/// Add collection-level values the feature does not carry itself
fn hydrate_feature(
    feature: &Value,
    collection: &Collection,
    id: Option<&str>,
    resolved: &ResolvedSchemas,
) -> Value {
    let mut feature = feature.clone();
    let Some(schema) = id.and_then(|id| resolved.get(id)) else {
        return feature;
    };
    let Some(object) = feature.as_object_mut() else {
        return feature;
    };
    if !object.get("properties").is_some_and(Value::is_object) {
        object.insert("properties".into(), Value::Object(Map::new()));
    }
    if let Some(Value::Object(properties)) = object.get_mut("properties") {
        for name in schema.collection.keys() {
            if properties.contains_key(name) {
                continue;
            }
            if let Some(value) = collection.property_value(id, name) {
                properties.insert(name.clone(), value.clone());
            }
        }
    }
    feature
}

fn check_geometry(feature: &Value, label: &str, report: &mut Report) {
    match feature.get("geometry") {
        None | Some(Value::Null) => {}
        Some(value) => match geojson::from_value(value) {
            Ok(geometry) => {
                if let Some(reason) = invalidity_reason(&geometry) {
                    report.error(format!("Feature {label}: invalid geometry ({reason})"));
                }
            }
            Err(e) => report.error(format!("Feature {label}: {e}")),
        },
    }

    if let Some(Value::Array(values)) = feature.get(BBOX_COLUMN) {
        let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
        if let [xmin, ymin, xmax, ymax] = numbers[..] {
            if !BBox::new(xmin, ymin, xmax, ymax).is_ordered() {
                report.error(format!(
                    "Feature {label}: bounding box must have xmin <= xmax and ymin <= ymax"
                ));
            }
        }
    }
}
