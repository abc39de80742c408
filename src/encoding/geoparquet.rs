//! GeoParquet encoding.
//!
//! The collection is stored as JSON under the `collection` key of the Parquet
//! key-value metadata, the spatial profile under `geo`. Geometries are WKB.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, ArrayRef};
use arrow::compute::{cast_with_options, concat_batches, CastOptions};
use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use geo_types::Geometry;
use indexmap::IndexMap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::{ArrowWriter, ProjectionMask};
use parquet::file::metadata::{KeyValue, ParquetMetaData};
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::collection::{Collection, COLLECTION_COLUMN};
use crate::config::{get_batch_size, GeoParquetVersion, ReadOptions, WriteOptions};
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{Result, VecorelError};
use crate::frame::{
    bbox_array, check_unique_columns, column_names, decode_dictionaries, drop_columns, geometries,
    select_columns, with_column, Dataset, BBOX_COLUMN, GEOMETRY_COLUMN,
};
use crate::geometry::{BBox, Crs, GeometryType};
use crate::hydration::dehydrate;
use crate::schema::{ResolveOptions, SchemaStore, VecorelSchema};
use crate::types::{bbox_data_type, storage_field, DataType};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Key-value metadata key of the spatial profile
pub const GEO_KEY: &str = "geo";
/// Key-value metadata key of the serialised collection
pub const COLLECTION_KEY: &str = "collection";

/// The `geo` file metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMetadata {
    pub version: String,
    pub primary_column: String,
    pub columns: IndexMap<String, GeoColumn>,
}

/// Metadata of one geometry column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoColumn {
    pub encoding: String,
    #[serde(default)]
    pub geometry_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covering: Option<Value>,
}

impl GeoMetadata {
    /// The primary column entry
    #[must_use]
    pub fn primary(&self) -> Option<&GeoColumn> {
        self.columns.get(&self.primary_column)
    }

    /// Well-formedness problems, empty if the metadata is usable
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !self.version.starts_with("1.") {
            problems.push(format!("Unsupported GeoParquet version {}", self.version));
        }
        if self.primary().is_none() {
            problems.push(format!(
                "Primary geometry column '{}' is not described in the geo metadata",
                self.primary_column
            ));
        }
        for (name, column) in &self.columns {
            if !column.encoding.eq_ignore_ascii_case("WKB") {
                problems.push(format!(
                    "Geometry column '{name}' must use WKB encoding, got {}",
                    column.encoding
                ));
            }
            for geometry_type in &column.geometry_types {
                if geometry_type.parse::<GeometryType>().is_err() {
                    problems.push(format!(
                        "Geometry column '{name}' lists unknown geometry type '{geometry_type}'"
                    ));
                }
            }
            if let Err(e) = Crs::from_projjson(column.crs.as_ref()) {
                problems.push(format!("Geometry column '{name}': {e}"));
            }
        }
        problems
    }
}

/// File-level information used by `describe` and the validator
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub collection: Collection,
    /// Whether the file carries a `collection` blob at all
    pub has_collection: bool,
    pub geo: Option<GeoMetadata>,
    /// Arrow schema of the stored columns
    pub schema: SchemaRef,
    pub num_rows: usize,
    pub num_row_groups: usize,
    /// Codec of the first column chunk
    pub compression: Option<String>,
}

fn metadata_value<'a>(metadata: &'a ParquetMetaData, key: &str) -> Option<&'a str> {
    metadata
        .file_metadata()
        .key_value_metadata()?
        .iter()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_deref())
}

fn parse_collection(text: Option<&str>) -> Result<Collection> {
    match text {
        Some(text) => Collection::from_json(text)
            .map_err(|e| e.context("Invalid 'collection' metadata in GeoParquet file")),
        None => Ok(Collection::new()),
    }
}

fn parse_geo(text: Option<&str>) -> Result<Option<GeoMetadata>> {
    text.map(|t| {
        serde_json::from_str(t).map_err(|e| {
            VecorelError::type_error(format!("Invalid 'geo' metadata in GeoParquet file: {e}"))
        })
    })
    .transpose()
}

fn primary_crs(geo: Option<&GeoMetadata>) -> Result<Crs> {
    Crs::from_projjson(geo.and_then(GeoMetadata::primary).and_then(|c| c.crs.as_ref()))
}

/// Same fields, no schema-level metadata
fn without_metadata(schema: &Schema) -> SchemaRef {
    Arc::new(Schema::new(schema.fields().clone()))
}

/// Read the file metadata without decoding any rows
pub fn inspect(path: &Path) -> Result<FileInfo> {
    let file = safe_open_file(path, "GeoParquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| VecorelError::Other(format!("Invalid Parquet file {}: {e}", path.display())))?;
    let metadata = builder.metadata().clone();
    let collection_text = metadata_value(&metadata, COLLECTION_KEY);

    let compression = (metadata.num_row_groups() > 0 && metadata.row_group(0).num_columns() > 0)
        .then(|| metadata.row_group(0).column(0).compression().to_string());

    Ok(FileInfo {
        collection: parse_collection(collection_text)?,
        has_collection: collection_text.is_some(),
        geo: parse_geo(metadata_value(&metadata, GEO_KEY))?,
        schema: without_metadata(builder.schema()),
        num_rows: usize::try_from(metadata.file_metadata().num_rows()).unwrap_or_default(),
        num_row_groups: metadata.num_row_groups(),
        compression,
    })
}

/// Root columns to read for a property subset
fn projection(
    builder: &ParquetRecordBatchReaderBuilder<std::fs::File>,
    properties: &[String],
    path: &Path,
) -> ProjectionMask {
    let schema = builder.schema();
    for property in properties {
        if schema.index_of(property).is_err() {
            log_warning(&format!("Property '{property}' not found in file"), Some(path));
        }
    }
    let roots: Vec<usize> = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| {
            let name = f.name().as_str();
            name == GEOMETRY_COLUMN
                || name == COLLECTION_COLUMN
                || properties.iter().any(|p| p == name)
        })
        .map(|(i, _)| i)
        .collect();
    ProjectionMask::roots(builder.parquet_schema(), roots)
}

/// Read a GeoParquet file into a dataset, keeping the stored column types
pub fn read(path: &Path, options: &ReadOptions) -> Result<Dataset> {
    let start = Instant::now();
    log_operation_start("Reading GeoParquet file", path);

    let file = safe_open_file(path, "GeoParquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| VecorelError::Other(format!("Invalid Parquet file {}: {e}", path.display())))?;
    let metadata = builder.metadata().clone();
    let collection = parse_collection(metadata_value(&metadata, COLLECTION_KEY))?;
    let geo = parse_geo(metadata_value(&metadata, GEO_KEY))?;
    let crs = primary_crs(geo.as_ref())?;
    if collection.is_empty() {
        log_warning("GeoParquet file has no collection metadata", Some(path));
    }

    let mut builder = builder.with_batch_size(get_batch_size());
    if let Some(properties) = &options.properties {
        let mask = projection(&builder, properties, path);
        builder = builder.with_projection(mask);
    }
    if let Some(num) = options.num {
        builder = builder.with_limit(num);
    }

    let reader = builder.build()?;
    let schema = without_metadata(&reader.schema());
    let batches = reader.collect::<std::result::Result<Vec<_>, ArrowError>>()?;
    let batch = concat_batches(&schema, &batches)?;

    log_operation_complete("read", path, batch.num_rows(), start.elapsed());
    Ok(Dataset::new(collection, batch).with_crs(crs))
}

/// Listed properties that are neither a column nor a collection-level value
fn missing_properties(batch: &RecordBatch, collection: &Collection, properties: &[String]) -> Vec<String> {
    let ids = collection.collection_ids().unwrap_or_default();
    properties
        .iter()
        .filter(|p| batch.column_by_name(p).is_none())
        .filter(|p| {
            collection.property_value(None, p).is_none()
                && ids.iter().all(|id| collection.property_value(Some(id), p).is_none())
        })
        .cloned()
        .collect()
}

/// Columns in property-list order. Unlisted columns are dropped, except the
/// geometry and collection columns.
fn order_columns(batch: &RecordBatch, properties: Option<&[String]>) -> Result<RecordBatch> {
    let Some(properties) = properties else {
        return Ok(batch.clone());
    };
    let names = column_names(batch);
    let mut ordered: Vec<String> = properties
        .iter()
        .filter(|p| names.contains(p))
        .cloned()
        .collect();
    for reserved in [GEOMETRY_COLUMN, COLLECTION_COLUMN] {
        if names.iter().any(|n| n == reserved) && !ordered.iter().any(|n| n == reserved) {
            ordered.push(reserved.to_string());
        }
    }
    select_columns(batch, &ordered)
}

/// Cast declared properties to their storage type and enforce required
/// properties to be non-null
fn to_storage(batch: &RecordBatch, schema: &VecorelSchema) -> Result<RecordBatch> {
    let options = CastOptions {
        safe: false,
        ..CastOptions::default()
    };
    let mut fields: Vec<Field> = Vec::with_capacity(batch.num_columns());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(batch.num_columns());

    for (field, column) in batch.schema().fields().iter().zip(batch.columns()) {
        let name = field.name();
        let Some(property) = schema.property(name) else {
            fields.push(field.as_ref().clone().with_nullable(true));
            columns.push(column.clone());
            continue;
        };
        let required = schema.is_required(name);
        let target = storage_field(name, property, required)?;
        if required && column.null_count() > 0 {
            return Err(VecorelError::type_error(format!(
                "Column '{name}' is required but contains {} null values",
                column.null_count()
            )));
        }
        let column = if column.data_type() == target.data_type() {
            column.clone()
        } else {
            cast_with_options(column, target.data_type(), &options).map_err(|e| {
                VecorelError::type_error(format!(
                    "Column '{name}' cannot be stored as {}: {e}",
                    target.data_type()
                ))
            })?
        };
        fields.push(target);
        columns.push(column);
    }

    let options =
        arrow::record_batch::RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
    Ok(RecordBatch::try_new_with_options(
        Arc::new(Schema::new(fields)),
        columns,
        &options,
    )?)
}

/// Names of geometry columns: the primary one plus any declared `geometry`
fn geometry_columns(batch: &RecordBatch, schema: &VecorelSchema) -> Vec<String> {
    column_names(batch)
        .into_iter()
        .filter(|name| {
            name == GEOMETRY_COLUMN
                || schema
                    .property(name)
                    .is_some_and(|p| p.data_type == Some(DataType::Geometry))
        })
        .collect()
}

fn column_metadata(
    geometries: &[Option<Geometry<f64>>],
    crs: &Crs,
    covering: Option<Value>,
) -> GeoColumn {
    let geometry_types: BTreeSet<&str> = geometries
        .iter()
        .flatten()
        .map(|g| GeometryType::from_geometry(g).as_str())
        .collect();
    let bbox = geometries
        .iter()
        .flatten()
        .filter_map(BBox::of)
        .reduce(BBox::union)
        .map(|b| b.to_array().to_vec());
    GeoColumn {
        encoding: "WKB".to_string(),
        geometry_types: geometry_types.into_iter().map(str::to_string).collect(),
        crs: Some(crs.to_projjson()),
        bbox,
        covering,
    }
}

fn bbox_covering() -> Value {
    json!({
        "bbox": {
            "xmin": [BBOX_COLUMN, "xmin"],
            "ymin": [BBOX_COLUMN, "ymin"],
            "xmax": [BBOX_COLUMN, "xmax"],
            "ymax": [BBOX_COLUMN, "ymax"]
        }
    })
}

/// Write a dataset as GeoParquet.
///
/// The dataset is dehydrated against its resolved schemas, columns are
/// ordered by `properties`, a stale `bbox` column is dropped and recomputed
/// for GeoParquet 1.1, and declared properties are cast to their storage
/// types.
pub fn write(
    dataset: Dataset,
    path: &Path,
    properties: Option<&[String]>,
    options: &WriteOptions,
    store: &SchemaStore,
) -> Result<()> {
    let start = Instant::now();
    log_operation_start("Writing GeoParquet file", path);

    check_unique_columns(&dataset.batch.schema())?;
    dataset.collection.check()?;
    let resolved = dataset.collection.resolve(store, ResolveOptions::default())?;
    let Dataset {
        collection,
        batch,
        crs,
    } = dehydrate(dataset, &resolved)?;
    let schema = resolved.merged();

    for name in &schema.required {
        if batch.column_by_name(name).is_none() && collection.property_value(None, name).is_none() {
            log_warning(&format!("Required property '{name}' is missing"), Some(path));
        }
    }

    if let Some(properties) = properties {
        for name in missing_properties(&batch, &collection, properties) {
            log_warning(&format!("Property '{name}' is not in the dataset"), Some(path));
        }
    }
    let batch = decode_dictionaries(&batch)?;
    let batch = order_columns(&batch, properties)?;
    let mut batch = drop_columns(&batch, &[BBOX_COLUMN])?;

    let mut columns: IndexMap<String, GeoColumn> = IndexMap::new();
    for name in geometry_columns(&batch, &schema) {
        let Some(column) = batch.column_by_name(&name) else {
            continue;
        };
        let geoms = geometries(column.as_ref())?;
        let is_primary = name == GEOMETRY_COLUMN;
        let writes_bbox = is_primary && options.geoparquet_version.writes_bbox();
        if writes_bbox {
            let field = Field::new(BBOX_COLUMN, bbox_data_type(), true);
            batch = with_column(&batch, field, bbox_array(&geoms)?)?;
        }
        let covering = writes_bbox.then(bbox_covering);
        columns.insert(name, column_metadata(&geoms, &crs, covering));
    }

    let batch = to_storage(&batch, &schema)?;
    let mut key_value = vec![KeyValue::new(
        COLLECTION_KEY.to_string(),
        collection.to_json()?,
    )];
    if !columns.is_empty() {
        let geo = GeoMetadata {
            version: options.geoparquet_version.as_str().to_string(),
            primary_column: GEOMETRY_COLUMN.to_string(),
            columns,
        };
        key_value.push(KeyValue::new(GEO_KEY.to_string(), serde_json::to_string(&geo)?));
    } else {
        log_warning("Dataset has no geometry column", Some(path));
    }

    let props = WriterProperties::builder()
        .set_compression(options.compression.to_parquet())
        .set_max_row_group_size(options.row_group_size)
        .set_key_value_metadata(Some(key_value))
        .build();

    let file = safe_create_file(path, "GeoParquet file")?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    log_operation_complete("wrote", path, batch.num_rows(), start.elapsed());
    Ok(())
}

/// Convenience for callers that already know the version only
#[must_use]
pub fn write_options(version: GeoParquetVersion) -> WriteOptions {
    WriteOptions {
        geoparquet_version: version,
        ..WriteOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{bbox_values, geometry_array};
    use crate::utils::test::fixtures::{sample_dataset, test_store, ADMIN_SCHEMA};
    use crate::utils::test::helpers::square;
    use arrow::array::{AsArray, StringArray};
    use arrow::datatypes::{DataType as ArrowType, TimeUnit};
    use serde_json::json;

    #[test]
    fn test_round_trip_preserves_values_and_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fields.parquet");
        let dataset = sample_dataset();
        write(dataset.clone(), &path, None, &WriteOptions::default(), &test_store()).unwrap();

        let read_back = read(&path, &ReadOptions::default()).unwrap();
        assert_eq!(read_back.num_rows(), 3);
        for name in ["id", "geometry", "area", "determination_datetime"] {
            assert_eq!(
                read_back.column(name).unwrap().as_ref(),
                dataset.column(name).unwrap().as_ref(),
                "column {name}"
            );
        }
        assert_eq!(
            read_back.batch.schema().field_with_name("determination_datetime").unwrap().data_type(),
            &ArrowType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
        );
        assert_eq!(read_back.collection.get_schemas().unwrap(), dataset.collection.get_schemas().unwrap());
        assert_eq!(read_back.crs, Crs::WGS84);
    }

    #[test]
    fn test_geo_metadata_and_bbox_by_version() {
        let dir = tempfile::tempdir().unwrap();
        let v10 = dir.path().join("v10.parquet");
        let v11 = dir.path().join("v11.parquet");
        let store = test_store();
        write(sample_dataset(), &v10, None, &write_options(GeoParquetVersion::V1_0), &store).unwrap();
        write(sample_dataset(), &v11, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();

        let info = inspect(&v10).unwrap();
        assert!(info.schema.index_of(BBOX_COLUMN).is_err());
        let geo = info.geo.unwrap();
        assert_eq!(geo.version, "1.0.0");
        assert_eq!(geo.primary().unwrap().geometry_types, vec!["Polygon"]);
        assert!(geo.problems().is_empty());

        let info = inspect(&v11).unwrap();
        assert!(info.schema.index_of(BBOX_COLUMN).is_ok());
        assert!(info.geo.unwrap().primary().unwrap().covering.is_some());
        let dataset = read(&v11, &ReadOptions::default()).unwrap();
        let boxes = bbox_values(dataset.column(BBOX_COLUMN).unwrap().as_ref()).unwrap();
        assert_eq!(boxes[0], Some(BBox::new(0.0, 0.0, 1.0, 1.0)));
    }

    #[test]
    fn test_geometry_types_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.parquet");
        let mut dataset = sample_dataset();
        let multi = Geometry::MultiPolygon(geo_types::MultiPolygon(vec![square(5.0, 5.0, 1.0)]));
        let geoms = vec![
            Some(multi),
            Some(Geometry::Polygon(square(0.0, 0.0, 1.0))),
            Some(Geometry::Polygon(square(2.0, 0.0, 1.0))),
        ];
        dataset.batch = with_column(
            &dataset.batch,
            Field::new(GEOMETRY_COLUMN, ArrowType::Binary, true),
            geometry_array(&geoms),
        )
        .unwrap();
        write(dataset, &path, None, &WriteOptions::default(), &test_store()).unwrap();
        let geo = inspect(&path).unwrap().geo.unwrap();
        assert_eq!(geo.primary().unwrap().geometry_types, vec!["MultiPolygon", "Polygon"]);
    }

    #[test]
    fn test_column_order_follows_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ordered.parquet");
        let properties = vec!["geometry".to_string(), "unknown".to_string(), "id".to_string()];
        let options = write_options(GeoParquetVersion::V1_0);
        write(sample_dataset(), &path, Some(&properties), &options, &test_store()).unwrap();
        let names: Vec<String> = inspect(&path)
            .unwrap()
            .schema
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["geometry", "id"]);
    }

    #[test]
    fn test_unlisted_columns_are_dropped_but_geometry_kept() {
        let dataset = sample_dataset();
        let properties = vec!["area".to_string(), "id".to_string()];
        let ordered = order_columns(&dataset.batch, Some(&properties)).unwrap();
        assert_eq!(column_names(&ordered), vec!["area", "id", "geometry"]);
    }

    #[test]
    fn test_missing_listed_properties() {
        let mut dataset = sample_dataset();
        dataset.collection.set_property_value(None, "admin:country_code", json!("DE"));
        let properties = vec![
            "id".to_string(),
            "admin:country_code".to_string(),
            "crop:code".to_string(),
        ];
        let missing = missing_properties(&dataset.batch, &dataset.collection, &properties);
        assert_eq!(missing, vec!["crop:code"]);
    }

    #[test]
    fn test_required_nulls_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut dataset = sample_dataset();
        dataset.batch = with_column(
            &dataset.batch,
            Field::new("id", ArrowType::Utf8, true),
            Arc::new(StringArray::from(vec![Some("a"), None, Some("c")])),
        )
        .unwrap();
        let result = write(
            dataset,
            &dir.path().join("nulls.parquet"),
            None,
            &WriteOptions::default(),
            &test_store(),
        );
        assert!(matches!(result, Err(VecorelError::Type(_))));
    }

    #[test]
    fn test_collection_property_is_dehydrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.parquet");
        let mut dataset = sample_dataset();
        let mut schemas = dataset.collection.get_schemas().unwrap();
        let id = schemas.single_id().unwrap().to_string();
        schemas.add(&id, ADMIN_SCHEMA);
        dataset.collection.set_schemas(&schemas);
        dataset.batch = with_column(
            &dataset.batch,
            Field::new("admin:country_code", ArrowType::Utf8, true),
            Arc::new(StringArray::from(vec!["DE"; 3])),
        )
        .unwrap();
        write(dataset, &path, None, &WriteOptions::default(), &test_store()).unwrap();

        let stored = read(&path, &ReadOptions::default()).unwrap();
        assert!(stored.column("admin:country_code").is_none());
        assert_eq!(stored.collection.get("admin:country_code"), Some(&json!("DE")));

        let hydrated = crate::encoding::read_dataset(
            &path,
            &ReadOptions::default().with_hydrate(true),
            &test_store(),
        )
        .unwrap();
        let codes = hydrated.column("admin:country_code").unwrap();
        assert_eq!(codes.len(), 3);
        assert!(codes.as_string::<i32>().iter().all(|v| v == Some("DE")));
    }

    #[test]
    fn test_missing_collection_blob_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.parquet");
        let batch = sample_dataset().batch;
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let info = inspect(&path).unwrap();
        assert!(!info.has_collection);
        assert!(info.geo.is_none());
        let dataset = read(&path, &ReadOptions::default().with_num(2)).unwrap();
        assert!(dataset.collection.is_empty());
        assert_eq!(dataset.num_rows(), 2);
    }

    #[test]
    fn test_property_projection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fields.parquet");
        write(sample_dataset(), &path, None, &WriteOptions::default(), &test_store()).unwrap();
        let options = ReadOptions {
            properties: Some(vec!["area".to_string()]),
            ..ReadOptions::default()
        };
        let dataset = read(&path, &options).unwrap();
        assert_eq!(dataset.column_names(), vec!["geometry", "area"]);
    }
}
