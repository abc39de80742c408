//! Concatenating datasets from several files into one.

use std::path::{Path, PathBuf};

use arrow::datatypes::{DataType as ArrowType, Field};

use crate::collection::{Collection, COLLECTIONS_KEY, COLLECTION_COLUMN};
use crate::error::{Result, VecorelError};
use crate::frame::{
    column_names, concat_union, drop_columns, drop_null_columns, repeat_string, select_columns,
    with_column, Dataset, GEOMETRY_COLUMN,
};
use crate::geometry::Crs;
use crate::schema::{Schemas, VecorelSchema};
use crate::utils::logging::log_warning;

use super::reproject;

/// Columns every merged dataset keeps
const REQUIRED_COLUMNS: [&str; 3] = ["id", GEOMETRY_COLUMN, COLLECTION_COLUMN];

#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Common CRS of the output
    pub crs: Crs,
    /// Extra properties to keep; with any given, all others are dropped
    pub include: Vec<String>,
    /// Properties to drop
    pub exclude: Vec<String>,
}

/// Collection id of a dataset without a `collection` column
fn default_collection_id(schemas: &Schemas, path: &Path) -> String {
    match schemas.single_id() {
        Some(id) => id.to_string(),
        None => path.display().to_string(),
    }
}

/// Merge datasets read from the given paths.
///
/// Every dataset is reprojected to the common CRS and gets a `collection`
/// column if it lacks one. Schemas are unioned per collection id and custom
/// schemas are merged in input order. Columns that hold only nulls are
/// dropped from the result.
pub fn merge(inputs: Vec<(PathBuf, Dataset)>, options: &MergeOptions) -> Result<Dataset> {
    if inputs.is_empty() {
        return Err(VecorelError::Other("Nothing to merge".to_string()));
    }

    let mut schemas = Schemas::new();
    let mut custom = VecorelSchema::new();
    let mut metadata = Collection::new();
    let mut batches = Vec::with_capacity(inputs.len());

    for (path, dataset) in inputs {
        let dataset = reproject(dataset, &options.crs)?;
        let mut batch = dataset.batch;

        let dataset_schemas = dataset.collection.get_schemas()?;
        if batch.column_by_name(COLLECTION_COLUMN).is_none() {
            let id = default_collection_id(&dataset_schemas, &path);
            if dataset_schemas.get(&id).is_none() {
                log_warning(
                    &format!("Cannot tell which collection the rows belong to, using '{id}'"),
                    Some(&path),
                );
            }
            batch = with_column(
                &batch,
                Field::new(COLLECTION_COLUMN, ArrowType::Utf8, false),
                repeat_string(&id, batch.num_rows()),
            )?;
        }
        schemas.merge(&dataset_schemas);
        custom.merge(&dataset.collection.get_custom_schemas()?);

        for (key, value) in dataset.collection.metadata() {
            if !metadata.contains_key(key) {
                metadata.insert(key.clone(), value.clone());
            }
        }
        batches.push(batch);
    }

    let mut batch = drop_null_columns(&concat_union(&batches)?)?;

    if !options.include.is_empty() {
        let keep: Vec<String> = column_names(&batch)
            .into_iter()
            .filter(|name| {
                REQUIRED_COLUMNS.contains(&name.as_str()) || options.include.contains(name)
            })
            .collect();
        batch = select_columns(&batch, &keep)?;
    }
    if !options.exclude.is_empty() {
        let drop: Vec<&str> = options
            .exclude
            .iter()
            .map(String::as_str)
            .filter(|name| !REQUIRED_COLUMNS.contains(name))
            .collect();
        batch = drop_columns(&batch, &drop)?;
    }

    // Collection-level values of the inputs are rows now
    let columns = column_names(&batch);
    let mut collection = Collection::with_schemas(&schemas);
    for (key, value) in metadata.iter() {
        if !columns.contains(key) && key != COLLECTIONS_KEY {
            collection.insert(key.clone(), value.clone());
        }
    }
    collection.set_custom_schemas(&custom)?;

    log::info!(
        "Merged {} rows from {} collections",
        batch.num_rows(),
        schemas.len()
    );
    Ok(Dataset {
        collection,
        batch,
        crs: options.crs.clone(),
    })
}
