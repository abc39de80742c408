//! Structural checks of GeoParquet files.

use std::path::Path;

use arrow::datatypes::Field;

use crate::collection::Collection;
use crate::config::ReadOptions;
use crate::encoding::geoparquet::{self, GeoMetadata};
use crate::encoding::read_dataset;
use crate::error::Result;
use crate::geometry::GeometryType;
use crate::schema::{PropertySchema, ResolvedSchemas, SchemaStore, VecorelSchema};
use crate::types::{check_columnar_type, DataType};

use super::{resolve_collection, values, Report, ValidatorConfig};

/// Validate the metadata and column types of a GeoParquet file and, with
/// `config.data`, every row value
pub fn validate(
    path: &Path,
    config: &ValidatorConfig,
    store: &SchemaStore,
    report: &mut Report,
) -> Result<()> {
    let info = geoparquet::inspect(path)?;

    match &info.geo {
        Some(geo) => {
            for problem in geo.problems() {
                report.error(problem);
            }
        }
        None => report.error("No 'geo' metadata found in the GeoParquet file"),
    }

    let Some(resolved) = resolve_collection(&info.collection, config, store, report) else {
        return Ok(());
    };

    check_columns(&info, &resolved, report);

    if config.data {
        let options = ReadOptions {
            num: config.num,
            properties: None,
            hydrate: true,
        };
        let dataset = read_dataset(path, &options, store)?;
        values::check(&dataset, &resolved, report)?;
    }
    Ok(())
}

fn check_columns(info: &geoparquet::FileInfo, resolved: &ResolvedSchemas, report: &mut Report) {
    let merged = resolved.merged();
    let multi = resolved.is_multi_collection();

    for (name, prop) in &merged.properties {
        let Ok(field) = info.schema.field_with_name(name) else {
            if merged.is_required(name) && !is_dehydrated(&info.collection, resolved, name) {
                report.error(format!("Required property '{name}' is missing"));
            }
            continue;
        };
        check_field(field, prop, &merged, multi, report);
        if prop.data_type == Some(DataType::Geometry) {
            check_geometry_types(name, prop, info.geo.as_ref(), report);
        }
    }

    for field in info.schema.fields() {
        if merged.property(field.name()).is_none() {
            report.warning(format!(
                "Column '{}' is not defined in any schema",
                field.name()
            ));
        }
    }
}

fn check_field(
    field: &Field,
    prop: &PropertySchema,
    schema: &VecorelSchema,
    multi: bool,
    report: &mut Report,
) {
    let name = field.name();
    match check_columnar_type(name, prop, field.data_type()) {
        Ok(check) => {
            if let Some(message) = check.describe(name) {
                report.error(message);
            }
        }
        Err(e) => report.error(e.to_string()),
    }

    // Rows of another collection may leave the column empty
    if !multi && schema.is_required(name) && field.is_nullable() {
        report.error(format!("{name}: required property must not be nullable"));
    }
}

/// A required property may live in the collection instead of the columns
fn is_dehydrated(collection: &Collection, resolved: &ResolvedSchemas, property: &str) -> bool {
    resolved.iter().all(|(id, schema)| {
        !schema.is_required(property)
            || (schema.is_collection_scoped(property)
                && collection.property_value(Some(id), property).is_some())
    })
}

/// Parse `geometryTypes`, ignoring the ` Z` suffix of 3D variants
pub(crate) fn allowed_geometry_types(prop: &PropertySchema) -> Vec<GeometryType> {
    prop.geometry_types
        .iter()
        .flatten()
        .filter_map(|t| t.trim_end_matches(" Z").parse().ok())
        .collect()
}

fn check_geometry_types(
    name: &str,
    prop: &PropertySchema,
    geo: Option<&GeoMetadata>,
    report: &mut Report,
) {
    let allowed = allowed_geometry_types(prop);
    if allowed.is_empty() {
        return;
    }
    let Some(geo) = geo else { return };
    let Some(column) = geo.columns.get(name) else {
        report.error(format!("{name}: column is not described in the geo metadata"));
        return;
    };

    for stored in &column.geometry_types {
        let Ok(geometry_type) = stored.trim_end_matches(" Z").parse::<GeometryType>() else {
            continue;
        };
        if !allowed.contains(&geometry_type) {
            report.error(format!(
                "{name}: geometry type {stored} is not allowed, expected one of {}",
                prop.geometry_types.iter().flatten().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
    }
}
