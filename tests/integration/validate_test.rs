use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use geo_types::{polygon, Geometry};
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use serde_json::json;
use tempfile::tempdir;
use vecorel::config::{GeoParquetVersion, ReadOptions};
use vecorel::encoding::geoparquet::{self, write_options};
use vecorel::frame::geometry_array;
use vecorel::ops::{improve, ImproveOptions};
use vecorel::schema::VECOREL_SCHEMA;
use vecorel::validator::report::Level;
use vecorel::{read_dataset, validate, ValidatorConfig};

use crate::utils::{
    feature, feature_collection, sample_features, schemas_for, square, test_store, write_json,
    ADMIN_SCHEMA,
};

fn with_data() -> ValidatorConfig {
    ValidatorConfig {
        data: true,
        ..ValidatorConfig::default()
    }
}

fn multipolygon() -> serde_json::Value {
    json!({
        "type": "MultiPolygon",
        "coordinates": [
            [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]],
            [[[3.0, 0.0], [4.0, 0.0], [4.0, 1.0], [3.0, 1.0], [3.0, 0.0]]]
        ]
    })
}

#[test]
fn test_valid_feature_collection() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.geojson");
    write_json(
        &path,
        &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), sample_features()),
    );
    let report = validate(&path, &with_data(), &test_store());
    assert!(report.is_valid(), "{:?}", report.issues);
}

/// Too long and not matching the pattern: two errors for one value
#[test]
fn test_country_code_violations() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.geojson");
    let document = feature_collection(
        schemas_for("fields", &[VECOREL_SCHEMA, ADMIN_SCHEMA]),
        vec![feature("1", square(0.0, 0.0, 1.0), json!({"admin:country_code": "DEE"}))],
    );
    write_json(&path, &document);

    let report = validate(&path, &ValidatorConfig::default(), &test_store());
    assert_eq!(report.error_count(), 2, "{:?}", report.issues);
}

#[test]
fn test_unordered_bbox_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.geojson");
    let mut bad = feature("1", square(0.0, 0.0, 1.0), json!({}));
    bad["bbox"] = json!([1.0, 0.0, 0.0, 1.0]);
    write_json(
        &path,
        &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), vec![bad]),
    );

    let report = validate(&path, &with_data(), &test_store());
    assert!(!report.is_valid());
    assert!(report.errors().any(|e| e.contains("bounding box")));
}

/// `uniqueItems` on arrays of objects is skipped with a note
#[test]
fn test_unique_items_on_objects_is_noted() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.geojson");
    let mut collection = schemas_for("fields", &[VECOREL_SCHEMA]);
    collection["schemas:custom"] = json!({
        "properties": {
            "crops": {"type": "array", "uniqueItems": true, "items": {"type": "object"}}
        }
    });
    let features = vec![feature(
        "1",
        square(0.0, 0.0, 1.0),
        json!({"crops": [{"code": 1}, {"code": 1}]}),
    )];
    write_json(&path, &feature_collection(collection, features));

    let report = validate(&path, &ValidatorConfig::default(), &test_store());
    assert!(report.is_valid(), "{:?}", report.issues);
    assert!(report
        .with_level(Level::Info)
        .any(|i| i.message.contains("crops") && i.message.contains("uniqueItems")));
}

/// Timestamps must be stored with millisecond precision
#[test]
fn test_microsecond_datetime_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("micro.parquet");
    write_raw_parquet(&path);

    let report = validate(&path, &ValidatorConfig::default(), &test_store());
    assert!(!report.is_valid());
    assert!(
        report.errors().any(|e| e.contains("determination_datetime")),
        "{:?}",
        report.issues
    );
}

/// Polygon-only geometry column with a MultiPolygon fails until exploded
#[test]
fn test_multipolygon_passes_after_explode() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let input = dir.path().join("multi.geojson");
    write_json(
        &input,
        &feature_collection(
            schemas_for("fields", &[VECOREL_SCHEMA]),
            vec![feature("1", multipolygon(), json!({}))],
        ),
    );
    let dataset = read_dataset(&input, &ReadOptions::default(), &store).unwrap();
    let parquet = dir.path().join("multi.parquet");
    geoparquet::write(dataset, &parquet, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();

    let report = validate(&parquet, &with_data(), &store);
    assert!(!report.is_valid());
    assert!(report.errors().any(|e| e.contains("MultiPolygon")));

    let dataset = read_dataset(&parquet, &ReadOptions::default().with_hydrate(true), &store).unwrap();
    let options = ImproveOptions {
        explode_geometries: true,
        ..ImproveOptions::default()
    };
    let exploded = improve(dataset, &options).unwrap();
    assert_eq!(exploded.num_rows(), 2);
    let fixed = dir.path().join("exploded.parquet");
    geoparquet::write(exploded, &fixed, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();

    let report = validate(&fixed, &with_data(), &store);
    assert!(report.is_valid(), "{:?}", report.issues);
}

#[test]
fn test_required_schema_must_be_declared() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("fields.geojson");
    write_json(
        &path,
        &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), sample_features()),
    );
    let config = ValidatorConfig {
        required_schemas: vec![r"https://vecorel\.org/administrative-division-extension/.*".to_string()],
        ..ValidatorConfig::default()
    };
    let report = validate(&path, &config, &test_store());
    assert_eq!(report.error_count(), 1);
}

#[test]
fn test_missing_file_is_reported() {
    let report = validate(Path::new("/not/there.parquet"), &ValidatorConfig::default(), &test_store());
    assert!(!report.is_valid());
}

/// GeoParquet file with a microsecond timestamp column, written without the
/// crate's writer so the storage type is not corrected
fn write_raw_parquet(path: &Path) {
    let geometry = Geometry::Polygon(polygon![
        (x: 0.0, y: 0.0),
        (x: 1.0, y: 0.0),
        (x: 1.0, y: 1.0),
        (x: 0.0, y: 0.0),
    ]);
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("geometry", DataType::Binary, false),
        Field::new(
            "determination_datetime",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            true,
        ),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["1"])),
        geometry_array(&[Some(geometry)]),
        Arc::new(TimestampMicrosecondArray::from(vec![Some(1_700_000_000_000_000)]).with_timezone("UTC")),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let geo = json!({
        "version": "1.1.0",
        "primary_column": "geometry",
        "columns": {"geometry": {"encoding": "WKB", "geometry_types": ["Polygon"]}}
    });
    let collection = json!({"schemas": {"fields": [VECOREL_SCHEMA]}});
    let properties = WriterProperties::builder()
        .set_key_value_metadata(Some(vec![
            KeyValue::new("geo".to_string(), geo.to_string()),
            KeyValue::new("collection".to_string(), collection.to_string()),
        ]))
        .build();
    let file = File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, schema, Some(properties)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}
