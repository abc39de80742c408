//! Moving collection-constant properties between rows and the collection.
//!
//! Dehydration lifts a collection-scoped property whose value is the same for
//! every row of a collection into the collection metadata and drops the
//! column. Hydration broadcasts such values back into a per-row column.
//!
//! With several collections in one file, a property is only dehydrated when
//! every collection present declares it collection-scoped. A value shared by
//! all collections is stored at the top level of the collection metadata,
//! differing values under `collections.{id}.{property}`.

use indexmap::IndexMap;
use serde_json::Value;

use crate::collection::COLLECTION_COLUMN;
use crate::error::Result;
use crate::frame::json::{build_array, column_values, infer_type};
use crate::frame::{drop_columns, with_column, Dataset, GEOMETRY_COLUMN};
use crate::schema::{ResolvedSchemas, VecorelSchema};
use crate::types::storage_field;
use crate::utils::logging::log_warning;

/// Columns that always stay per row
const PER_ROW: [&str; 3] = ["id", GEOMETRY_COLUMN, COLLECTION_COLUMN];

fn row_groups(dataset: &Dataset) -> Result<IndexMap<String, Vec<usize>>> {
    let ids = dataset.collection_ids()?;
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (row, id) in ids.into_iter().enumerate() {
        groups.entry(id.unwrap_or_default()).or_default().push(row);
    }
    Ok(groups)
}

/// Single non-null value shared by all given rows
fn unique_value<'a>(values: &'a [Value], rows: &[usize]) -> Option<&'a Value> {
    let first = values.get(*rows.first()?)?;
    if first.is_null() {
        return None;
    }
    rows.iter()
        .all(|row| values.get(*row) == Some(first))
        .then_some(first)
}

fn is_scoped_everywhere(resolved: &ResolvedSchemas, ids: &[&String], property: &str) -> bool {
    !ids.is_empty()
        && ids.iter().all(|id| {
            resolved
                .get(id)
                .or_else(|| single_schema(resolved))
                .is_some_and(|s| s.is_collection_scoped(property))
        })
}

/// Rows without a known collection id fall back to a sole collection
fn single_schema(resolved: &ResolvedSchemas) -> Option<&VecorelSchema> {
    let mut iter = resolved.iter();
    match (iter.next(), iter.next()) {
        (Some((_, schema)), None) => Some(schema),
        _ => None,
    }
}

/// Lift collection-scoped constant properties into the collection
pub fn dehydrate(dataset: Dataset, resolved: &ResolvedSchemas) -> Result<Dataset> {
    let Dataset {
        mut collection,
        batch,
        crs,
    } = dataset;
    let probe = Dataset::new(collection.clone(), batch.clone());
    let groups = row_groups(&probe)?;
    let ids: Vec<&String> = groups.keys().collect();

    let mut custom = collection.get_custom_schemas()?;
    let mut lifted: Vec<String> = Vec::new();

    for field in batch.schema().fields() {
        let name = field.name();
        if PER_ROW.contains(&name.as_str()) || !is_scoped_everywhere(resolved, &ids, name) {
            continue;
        }
        let Some(column) = batch.column_by_name(name) else {
            continue;
        };
        let values = column_values(column.as_ref())?;

        let mut per_collection: Vec<(&String, &Value)> = Vec::with_capacity(groups.len());
        for (id, rows) in &groups {
            match unique_value(&values, rows) {
                Some(value) => per_collection.push((id, value)),
                None => break,
            }
        }
        if per_collection.len() != groups.len() {
            log_warning(
                &format!("Property '{name}' is collection-scoped but has multiple values, keeping it per row"),
                None,
            );
            continue;
        }

        let shared = per_collection.iter().all(|(_, v)| *v == per_collection[0].1);
        if shared || groups.len() == 1 {
            collection.set_property_value(None, name, per_collection[0].1.clone());
        } else {
            for (id, value) in &per_collection {
                collection.set_property_value(Some(id.as_str()), name, (*value).clone());
            }
        }
        custom.collection.insert(name.clone(), true);
        lifted.push(name.clone());
    }

    if lifted.is_empty() {
        return Ok(Dataset {
            collection,
            batch,
            crs,
        });
    }

    log::debug!("Dehydrated {} properties: {}", lifted.len(), lifted.join(", "));
    collection.set_custom_schemas(&custom)?;
    let names: Vec<&str> = lifted.iter().map(String::as_str).collect();
    Ok(Dataset {
        collection,
        batch: drop_columns(&batch, &names)?,
        crs,
    })
}

/// Properties with a value stored in the collection that the schemas (or the
/// custom schema) declare collection-scoped
fn hydratable(dataset: &Dataset, resolved: Option<&ResolvedSchemas>) -> Result<Vec<String>> {
    let custom = dataset.collection.get_custom_schemas()?;
    let mut names: Vec<String> = Vec::new();

    let mut consider = |name: &str| {
        let scoped = custom.is_collection_scoped(name)
            || resolved.is_some_and(|r| r.iter().any(|(_, s)| s.is_collection_scoped(name)));
        if scoped
            && !names.iter().any(|n| n == name)
            && dataset.batch.column_by_name(name).is_none()
        {
            names.push(name.to_string());
        }
    };

    for (key, _) in dataset.collection.metadata() {
        consider(key);
    }
    if let Some(Value::Object(per_collection)) =
        dataset.collection.get(crate::collection::COLLECTIONS_KEY)
    {
        for values in per_collection.values().filter_map(Value::as_object) {
            for key in values.keys() {
                consider(key);
            }
        }
    }
    Ok(names)
}

/// Broadcast collection-level property values back into per-row columns.
///
/// Column types come from the resolved schemas when given, otherwise they
/// are inferred from the stored values. Hydrated values are removed from the
/// collection metadata.
pub fn hydrate(dataset: Dataset, resolved: Option<&ResolvedSchemas>) -> Result<Dataset> {
    let names = hydratable(&dataset, resolved)?;
    if names.is_empty() {
        return Ok(dataset);
    }

    let ids = dataset.collection_ids()?;
    let merged = resolved.map(ResolvedSchemas::merged);
    let Dataset {
        mut collection,
        mut batch,
        crs,
    } = dataset;

    for name in &names {
        let values: Vec<&Value> = ids
            .iter()
            .map(|id| {
                collection
                    .property_value(id.as_deref(), name)
                    .unwrap_or(&Value::Null)
            })
            .collect();

        let field = match merged.as_ref().and_then(|m| m.property(name)) {
            Some(schema) => storage_field(name, schema, false)?,
            None => arrow::datatypes::Field::new(name, infer_type(&values), true),
        };
        let array = build_array(&field, &values)?;
        batch = with_column(&batch, field, array)?;
    }
    for name in &names {
        collection.remove_property_value(name);
    }

    log::debug!("Hydrated {} properties: {}", names.len(), names.join(", "));
    Ok(Dataset {
        collection,
        batch,
        crs,
    })
}
