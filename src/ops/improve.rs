//! In-place improvements of a dataset: reprojection, geometry repair,
//! exploding multi-part geometries, property renames and derived sizes.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType as ArrowType, Field};
use serde_json::json;

use crate::error::{Result, VecorelError};
use crate::frame::{batch_geometries, rename_column, string_column, take_rows, with_column, Dataset};
use crate::geometry::ops::{explode, make_valid, measure, measure_geographic};
use crate::geometry::Crs;
use crate::schema::{PropertySchema, VecorelSchema};
use crate::utils::logging::log_warning;

use super::{reproject, set_geometries};

/// Area in square meters
pub const AREA_PROPERTY: &str = "metrics:area";
/// Perimeter in meters
pub const PERIMETER_PROPERTY: &str = "metrics:perimeter";

/// Improvements to apply, in the order the fields are listed
#[derive(Debug, Clone, Default)]
pub struct ImproveOptions {
    pub crs: Option<Crs>,
    pub fix_geometries: bool,
    pub explode_geometries: bool,
    /// `(old, new)` property names
    pub rename: Vec<(String, String)>,
    pub add_sizes: bool,
}

/// Parse an `old=new` rename argument
pub fn parse_rename(arg: &str) -> Result<(String, String)> {
    match arg.split_once('=') {
        Some((old, new)) if !old.trim().is_empty() && !new.trim().is_empty() => {
            Ok((old.trim().to_string(), new.trim().to_string()))
        }
        _ => Err(VecorelError::Other(format!(
            "Invalid rename '{arg}', expected old=new"
        ))),
    }
}

pub fn improve(mut dataset: Dataset, options: &ImproveOptions) -> Result<Dataset> {
    if let Some(crs) = &options.crs {
        dataset = reproject(dataset, crs)?;
    }
    if options.fix_geometries {
        dataset = fix_geometries(dataset)?;
    }
    if options.explode_geometries {
        dataset = explode_geometries(dataset)?;
    }
    if !options.rename.is_empty() {
        dataset = rename_properties(dataset, &options.rename)?;
    }
    if options.add_sizes {
        dataset = add_sizes(dataset)?;
    }
    Ok(dataset)
}

/// Repair invalid geometries
pub fn fix_geometries(dataset: Dataset) -> Result<Dataset> {
    let geometries: Vec<_> = batch_geometries(&dataset.batch)?
        .into_iter()
        .map(|g| g.map(make_valid))
        .collect();
    set_geometries(dataset, &geometries)
}

/// Split multi-part geometries into one row per part.
///
/// Ids of split rows get a `-{n}` suffix so they stay unique.
pub fn explode_geometries(dataset: Dataset) -> Result<Dataset> {
    let original = batch_geometries(&dataset.batch)?;
    let mut indices = Vec::with_capacity(original.len());
    let mut parts_per_row = Vec::with_capacity(original.len());
    let mut geometries = Vec::with_capacity(original.len());

    for (row, geometry) in original.into_iter().enumerate() {
        let parts = match geometry {
            Some(geometry) => explode(geometry).into_iter().map(Some).collect(),
            None => vec![None],
        };
        parts_per_row.push(parts.len());
        indices.extend(std::iter::repeat_n(row as u32, parts.len()));
        geometries.extend(parts);
    }
    if indices.len() == parts_per_row.len() {
        return Ok(dataset);
    }
    log::info!(
        "Exploded {} rows into {} rows",
        parts_per_row.len(),
        indices.len()
    );

    let mut batch = take_rows(&dataset.batch, &indices)?;
    if let Some(ids) = string_column(&batch, "id")? {
        let mut suffixed = Vec::with_capacity(ids.len());
        let mut part = 0;
        for (i, id) in ids.into_iter().enumerate() {
            let row = indices[i] as usize;
            part = if i > 0 && indices[i - 1] as usize == row { part + 1 } else { 1 };
            suffixed.push(match id {
                Some(id) if parts_per_row[row] > 1 => Some(format!("{id}-{part}")),
                other => other,
            });
        }
        let nullable = batch.schema().field_with_name("id").map_or(true, |f| f.is_nullable());
        batch = with_column(
            &batch,
            Field::new("id", ArrowType::Utf8, nullable),
            Arc::new(StringArray::from(suffixed)) as ArrayRef,
        )?;
    }
    set_geometries(Dataset { batch, ..dataset }, &geometries)
}

/// Rename properties in the columns, the custom schema and the collection
/// values
pub fn rename_properties(dataset: Dataset, renames: &[(String, String)]) -> Result<Dataset> {
    let Dataset {
        mut collection,
        mut batch,
        crs,
    } = dataset;
    let mut custom = collection.get_custom_schemas()?;

    for (old, new) in renames {
        let in_columns = batch.column_by_name(old).is_some();
        if in_columns {
            batch = rename_column(&batch, old, new)?;
        }
        let in_custom = custom.property(old).is_some();
        custom.rename_property(old, new);
        collection.rename_property_value(old, new);

        if !in_columns && !in_custom {
            log_warning(&format!("Property '{old}' not found, nothing renamed"), None);
        } else if !in_custom {
            log_warning(
                &format!("Property '{new}' is not declared by a custom schema, add one to describe it"),
                None,
            );
        }
    }
    collection.set_custom_schemas(&custom)?;
    Ok(Dataset {
        collection,
        batch,
        crs,
    })
}

/// Add area and perimeter columns, measured in an equal-area projection
/// when the data is not in a metric CRS
pub fn add_sizes(dataset: Dataset) -> Result<Dataset> {
    let geographic = dataset.crs.is_geographic()?;
    let geometries = batch_geometries(&dataset.batch)?;
    let mut areas = Vec::with_capacity(geometries.len());
    let mut perimeters = Vec::with_capacity(geometries.len());
    for geometry in &geometries {
        let (area, perimeter) = match geometry {
            Some(geometry) => {
                let (area, perimeter) = if geographic {
                    measure_geographic(geometry, &dataset.crs)?
                } else {
                    measure(geometry, None)?
                };
                (Some(area), Some(perimeter))
            }
            None => (None, None),
        };
        areas.push(area);
        perimeters.push(perimeter);
    }

    let batch = with_column(
        &dataset.batch,
        Field::new(AREA_PROPERTY, ArrowType::Float64, true),
        Arc::new(Float64Array::from(areas)) as ArrayRef,
    )?;
    let batch = with_column(
        &batch,
        Field::new(PERIMETER_PROPERTY, ArrowType::Float64, true),
        Arc::new(Float64Array::from(perimeters)) as ArrayRef,
    )?;

    let mut collection = dataset.collection;
    let mut custom = collection.get_custom_schemas()?;
    declare_size(&mut custom, AREA_PROPERTY, "Area in square meters");
    declare_size(&mut custom, PERIMETER_PROPERTY, "Perimeter in meters");
    collection.set_custom_schemas(&custom)?;

    Ok(Dataset {
        collection,
        batch,
        crs: dataset.crs,
    })
}

fn declare_size(custom: &mut VecorelSchema, name: &str, description: &str) {
    if custom.property(name).is_some() {
        return;
    }
    let schema = json!({"type": "double", "minimum": 0, "description": description});
    if let Ok(prop) = serde_json::from_value::<PropertySchema>(schema) {
        custom.properties.insert(name.to_string(), prop);
    }
}
