//! The in-memory dataframe: an Arrow `RecordBatch` plus collection metadata.
//!
//! Transforms never mutate a batch in place; every helper returns a new batch.

pub mod json;

use std::sync::Arc;

use arrow::array::{
    new_null_array, Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Float64Array,
    StringArray, StructArray,
};
use arrow::compute::{cast, concat_batches, filter_record_batch, take_record_batch};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use geo_types::Geometry;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::collection::{Collection, COLLECTION_COLUMN};
use crate::error::{Result, VecorelError};
use crate::geometry::{wkb, BBox, Crs};
use crate::types::columnar::BBOX_FIELDS;

/// Name of the primary geometry column
pub const GEOMETRY_COLUMN: &str = "geometry";
/// Name of the derived bounding box column
pub const BBOX_COLUMN: &str = "bbox";

/// A dataset read from or about to be written to an encoding
#[derive(Debug, Clone)]
pub struct Dataset {
    pub collection: Collection,
    pub batch: RecordBatch,
    /// CRS of the primary geometry column
    pub crs: Crs,
}

impl Dataset {
    #[must_use]
    pub fn new(collection: Collection, batch: RecordBatch) -> Self {
        Self {
            collection,
            batch,
            crs: Crs::WGS84,
        }
    }

    #[must_use]
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        column_names(&self.batch)
    }

    /// Per-row collection ids: the `collection` column if present, otherwise
    /// the single id declared in the collection metadata
    pub fn collection_ids(&self) -> Result<Vec<Option<String>>> {
        if let Some(ids) = string_column(&self.batch, COLLECTION_COLUMN)? {
            return Ok(ids);
        }
        let schemas = self.collection.get_schemas()?;
        let id = schemas.single_id().map(str::to_string);
        Ok(vec![id; self.num_rows()])
    }
}

#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// An empty batch without columns
#[must_use]
pub fn empty_batch() -> RecordBatch {
    RecordBatch::new_empty(Arc::new(Schema::empty()))
}

/// Fail on duplicate column names
pub fn check_unique_columns(schema: &Schema) -> Result<()> {
    let mut seen = FxHashSet::default();
    for field in schema.fields() {
        if !seen.insert(field.name().as_str()) {
            return Err(VecorelError::type_error(format!(
                "Duplicate column name '{}'",
                field.name()
            )));
        }
    }
    Ok(())
}

/// Build a batch from named columns; nullability follows the data
pub fn batch_from_columns(columns: Vec<(String, ArrayRef)>) -> Result<RecordBatch> {
    let num_rows = columns.first().map_or(0, |(_, a)| a.len());
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(name, array.data_type().clone(), true))
        .collect();
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, a)| a).collect();
    let options = arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(num_rows));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        arrays,
        &options,
    )?)
}

/// Keep the named columns that exist, in the given order
pub fn select_columns(batch: &RecordBatch, names: &[String]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices: Vec<usize> = names
        .iter()
        .filter_map(|name| schema.index_of(name).ok())
        .collect();
    Ok(batch.project(&indices)?)
}

/// Remove the named columns if present
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let schema = batch.schema();
    let indices: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&indices)?)
}

/// Add a column, replacing an existing one with the same name in place
pub fn with_column(batch: &RecordBatch, field: Field, array: ArrayRef) -> Result<RecordBatch> {
    let schema = batch.schema();
    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    let mut columns = batch.columns().to_vec();
    match schema.index_of(field.name()) {
        Ok(index) => {
            fields[index] = Arc::new(field);
            columns[index] = array;
        }
        Err(_) => {
            fields.push(Arc::new(field));
            columns.push(array);
        }
    }
    let options =
        arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
        &options,
    )?)
}

/// Rename a column, keeping its position
pub fn rename_column(batch: &RecordBatch, old: &str, new: &str) -> Result<RecordBatch> {
    let schema = batch.schema();
    let Ok(index) = schema.index_of(old) else {
        return Ok(batch.clone());
    };
    let mut fields: Vec<Arc<Field>> = schema.fields().iter().cloned().collect();
    fields[index] = Arc::new(fields[index].as_ref().clone().with_name(new));
    let renamed = Schema::new_with_metadata(fields, schema.metadata().clone());
    check_unique_columns(&renamed)?;
    Ok(RecordBatch::try_new(Arc::new(renamed), batch.columns().to_vec())?)
}

/// Drop columns that only hold nulls
pub fn drop_null_columns(batch: &RecordBatch) -> Result<RecordBatch> {
    let empty: Vec<String> = batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .filter(|(_, c)| batch.num_rows() > 0 && c.null_count() == c.len())
        .map(|(f, _)| f.name().clone())
        .collect();
    let names: Vec<&str> = empty.iter().map(String::as_str).collect();
    drop_columns(batch, &names)
}

/// Concatenate batches with differing columns.
///
/// The output has the union of all columns in first-seen order; columns
/// missing from a batch are filled with nulls and later batches are cast to
/// the type a column first appeared with.
pub fn concat_union(batches: &[RecordBatch]) -> Result<RecordBatch> {
    let mut fields: IndexMap<String, ArrowType> = IndexMap::new();
    for batch in batches {
        for field in batch.schema().fields() {
            fields
                .entry(field.name().clone())
                .or_insert_with(|| field.data_type().clone());
        }
    }
    let schema: SchemaRef = Arc::new(Schema::new(
        fields
            .iter()
            .map(|(name, data_type)| Field::new(name, data_type.clone(), true))
            .collect::<Vec<_>>(),
    ));

    let aligned = batches
        .iter()
        .map(|batch| {
            let columns = fields
                .iter()
                .map(|(name, data_type)| match batch.column_by_name(name) {
                    Some(column) if column.data_type() == data_type => Ok(column.clone()),
                    Some(column) => cast(column, data_type).map_err(|e| {
                        VecorelError::type_error(format!(
                            "Column '{name}' has incompatible types {} and {data_type}: {e}",
                            column.data_type()
                        ))
                    }),
                    None => Ok(new_null_array(data_type, batch.num_rows())),
                })
                .collect::<Result<Vec<_>>>()?;
            let options = arrow::record_batch::RecordBatchOptions::new()
                .with_row_count(Some(batch.num_rows()));
            Ok(RecordBatch::try_new_with_options(schema.clone(), columns, &options)?)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(concat_batches(&schema, &aligned)?)
}

/// Keep the rows where the mask is true
pub fn filter_rows(batch: &RecordBatch, mask: &[bool]) -> Result<RecordBatch> {
    Ok(filter_record_batch(batch, &BooleanArray::from(mask.to_vec()))?)
}

/// Gather rows by index; indices may repeat
pub fn take_rows(batch: &RecordBatch, indices: &[u32]) -> Result<RecordBatch> {
    let indices = arrow::array::UInt32Array::from(indices.to_vec());
    Ok(take_record_batch(batch, &indices)?)
}

/// A string column as owned values, casting dictionaries and large strings
pub fn string_column(batch: &RecordBatch, name: &str) -> Result<Option<Vec<Option<String>>>> {
    let Some(column) = batch.column_by_name(name) else {
        return Ok(None);
    };
    let strings = cast(column, &ArrowType::Utf8)?;
    Ok(Some(
        strings
            .as_string::<i32>()
            .iter()
            .map(|v| v.map(str::to_string))
            .collect(),
    ))
}

/// A string array repeating one value
#[must_use]
pub fn repeat_string(value: &str, len: usize) -> ArrayRef {
    Arc::new(StringArray::from(vec![value; len]))
}

/// Decode a WKB column; null or empty entries become `None`
pub fn geometries(column: &dyn Array) -> Result<Vec<Option<Geometry<f64>>>> {
    let decode = |bytes: Option<&[u8]>| match bytes {
        Some(b) if !b.is_empty() => wkb::decode(b).map(Some),
        _ => Ok(None),
    };
    match column.data_type() {
        ArrowType::Binary => column.as_binary::<i32>().iter().map(decode).collect(),
        ArrowType::LargeBinary => column.as_binary::<i64>().iter().map(decode).collect(),
        ArrowType::BinaryView => column.as_binary_view().iter().map(decode).collect(),
        other => Err(VecorelError::type_error(format!(
            "Geometry column must be binary WKB, got {other}"
        ))),
    }
}

/// Geometries of the primary geometry column
pub fn batch_geometries(batch: &RecordBatch) -> Result<Vec<Option<Geometry<f64>>>> {
    let column = batch.column_by_name(GEOMETRY_COLUMN).ok_or_else(|| {
        VecorelError::type_error(format!("Dataset has no '{GEOMETRY_COLUMN}' column"))
    })?;
    geometries(column.as_ref())
}

/// Encode geometries as a WKB column
#[must_use]
pub fn geometry_array(geometries: &[Option<Geometry<f64>>]) -> ArrayRef {
    Arc::new(BinaryArray::from_iter(
        geometries.iter().map(|g| g.as_ref().map(wkb::encode)),
    ))
}

/// Bounding box struct column derived from geometries
pub fn bbox_array(geometries: &[Option<Geometry<f64>>]) -> Result<ArrayRef> {
    let boxes: Vec<Option<BBox>> = geometries.iter().map(|g| g.as_ref().and_then(BBox::of)).collect();
    let component = |f: fn(&BBox) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(
            boxes.iter().map(|b| b.as_ref().map_or(0.0, f)).collect::<Vec<f64>>(),
        ))
    };
    let columns = vec![
        component(|b| b.xmin),
        component(|b| b.ymin),
        component(|b| b.xmax),
        component(|b| b.ymax),
    ];
    let fields = BBOX_FIELDS
        .iter()
        .map(|name| Field::new(*name, ArrowType::Float64, false))
        .collect::<Vec<_>>();
    let nulls = boxes
        .iter()
        .any(Option::is_none)
        .then(|| arrow::buffer::NullBuffer::from(boxes.iter().map(Option::is_some).collect::<Vec<_>>()));
    Ok(Arc::new(StructArray::try_new(fields.into(), columns, nulls)?))
}

/// Bounding boxes stored in a bbox struct column
pub fn bbox_values(column: &dyn Array) -> Result<Vec<Option<BBox>>> {
    let ArrowType::Struct(_) = column.data_type() else {
        return Err(VecorelError::type_error(format!(
            "Bounding box column must be a struct, got {}",
            column.data_type()
        )));
    };
    let structs = column.as_struct();
    let component = |name: &str| -> Result<Vec<Option<f64>>> {
        let child = structs.column_by_name(name).ok_or_else(|| {
            VecorelError::type_error(format!("Bounding box column lacks field '{name}'"))
        })?;
        let values = cast(child, &ArrowType::Float64)?;
        Ok(values.as_primitive::<arrow::datatypes::Float64Type>().iter().collect())
    };
    let [xmin, ymin, xmax, ymax] = BBOX_FIELDS.map(component);
    let (xmin, ymin, xmax, ymax) = (xmin?, ymin?, xmax?, ymax?);
    Ok((0..structs.len())
        .map(|i| {
            if structs.is_null(i) {
                return None;
            }
            Some(BBox::new(xmin[i]?, ymin[i]?, xmax[i]?, ymax[i]?))
        })
        .collect())
}

/// Dictionary-encoded columns are cast back to their value type
pub fn decode_dictionaries(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    if !schema
        .fields()
        .iter()
        .any(|f| matches!(f.data_type(), ArrowType::Dictionary(_, _)))
    {
        return Ok(batch.clone());
    }
    let mut fields = Vec::with_capacity(schema.fields().len());
    let mut columns = Vec::with_capacity(schema.fields().len());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if let ArrowType::Dictionary(_, value_type) = field.data_type() {
            columns.push(cast(column, value_type)?);
            fields.push(field.as_ref().clone().with_data_type(value_type.as_ref().clone()));
        } else {
            columns.push(column.clone());
            fields.push(field.as_ref().clone());
        }
    }
    Ok(RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )?)
}
