use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, TimeUnit};
use serde_json::json;
use tempfile::tempdir;
use vecorel::config::{GeoJsonOptions, GeoParquetVersion, ReadOptions};
use vecorel::encoding::geoparquet::{inspect, write_options};
use vecorel::encoding::{geojson, geoparquet};
use vecorel::frame::{bbox_values, string_column, BBOX_COLUMN};
use vecorel::geometry::BBox;
use vecorel::schema::VECOREL_SCHEMA;
use vecorel::{read_dataset, Dataset};

use crate::utils::{
    feature, feature_collection, sample_features, schemas_for, square, test_store, write_json,
    ADMIN_SCHEMA,
};

fn read_sample(dir: &std::path::Path, collection: serde_json::Value, features: Vec<serde_json::Value>) -> Dataset {
    let path = dir.join("input.geojson");
    write_json(&path, &feature_collection(collection, features));
    geojson::read(&path, &ReadOptions::default(), Some(&test_store())).unwrap()
}

/// Core-only dataset survives a GeoParquet round trip with its types
#[test]
fn test_core_dataset_roundtrip() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let dataset = read_sample(dir.path(), schemas_for("fields", &[VECOREL_SCHEMA]), sample_features());
    let out = dir.path().join("fields.parquet");
    geoparquet::write(dataset, &out, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();

    let info = inspect(&out).unwrap();
    assert_eq!(info.num_rows, 3);
    let schemas = info.collection.get_schemas().unwrap();
    assert_eq!(schemas.get("fields").unwrap(), [VECOREL_SCHEMA.to_string()]);

    let read = geoparquet::read(&out, &ReadOptions::default()).unwrap();
    assert_eq!(
        string_column(&read.batch, "id").unwrap().unwrap(),
        vec![Some("1".to_string()), Some("2".to_string()), Some("3".to_string())]
    );
    let area = read.column("area").unwrap().as_primitive::<Float64Type>();
    assert_eq!(area.value(0), 1.5);
    assert_eq!(area.value(1), 2.25);
    assert!(area.is_null(2));

    let datetime = read.batch.schema().field_with_name("determination_datetime").unwrap().clone();
    assert_eq!(
        datetime.data_type(),
        &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
    );
    let geometry = read.batch.schema().field_with_name("geometry").unwrap().clone();
    assert_eq!(geometry.data_type(), &DataType::Binary);
}

/// A collection-scoped constant is stored once and restored by hydration
#[test]
fn test_collection_scoped_property_is_dehydrated() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let features: Vec<_> = sample_features()
        .into_iter()
        .map(|mut f| {
            f["properties"]["admin:country_code"] = json!("DE");
            f
        })
        .collect();
    let dataset = read_sample(
        dir.path(),
        schemas_for("fields", &[VECOREL_SCHEMA, ADMIN_SCHEMA]),
        features,
    );
    let out = dir.path().join("fields.parquet");
    geoparquet::write(dataset, &out, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();

    let info = inspect(&out).unwrap();
    assert!(info.schema.field_with_name("admin:country_code").is_err());
    assert_eq!(info.collection.get("admin:country_code"), Some(&json!("DE")));

    let hydrated = read_dataset(&out, &ReadOptions::default().with_hydrate(true), &store).unwrap();
    assert_eq!(
        string_column(&hydrated.batch, "admin:country_code").unwrap().unwrap(),
        vec![Some("DE".to_string()); 3]
    );
}

/// Only GeoParquet 1.1 carries a bbox covering column
#[test]
fn test_bbox_column_by_version() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let dataset = read_sample(dir.path(), schemas_for("fields", &[VECOREL_SCHEMA]), sample_features());

    let v10 = dir.path().join("v10.parquet");
    geoparquet::write(dataset.clone(), &v10, None, &write_options(GeoParquetVersion::V1_0), &store).unwrap();
    let info = inspect(&v10).unwrap();
    assert!(info.schema.field_with_name(BBOX_COLUMN).is_err());
    assert_eq!(info.geo.unwrap().version, "1.0.0");

    let v11 = dir.path().join("v11.parquet");
    geoparquet::write(dataset, &v11, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();
    let info = inspect(&v11).unwrap();
    assert!(matches!(
        info.schema.field_with_name(BBOX_COLUMN).unwrap().data_type(),
        DataType::Struct(_)
    ));
    let read = geoparquet::read(&v11, &ReadOptions::default()).unwrap();
    let boxes = bbox_values(read.column(BBOX_COLUMN).unwrap().as_ref()).unwrap();
    assert_eq!(boxes[0], Some(BBox::new(0.0, 0.0, 1.0, 1.0)));
    assert_eq!(boxes[2], Some(BBox::new(4.0, 0.0, 5.0, 1.0)));
}

/// GeoParquet to GeoJSON and back keeps the declared columns
#[test]
fn test_feature_file_roundtrip() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let dataset = read_sample(dir.path(), schemas_for("fields", &[VECOREL_SCHEMA]), sample_features());
    let parquet = dir.path().join("fields.parquet");
    geoparquet::write(dataset, &parquet, None, &write_options(GeoParquetVersion::V1_0), &store).unwrap();

    let read = read_dataset(&parquet, &ReadOptions::default(), &store).unwrap();
    let json_path = dir.path().join("fields.json");
    let written = geojson::write(&read, &json_path, &GeoJsonOptions::default()).unwrap();
    assert_eq!(written, 3);

    let text = std::fs::read_to_string(&json_path).unwrap();
    let document: serde_json::Value = serde_json::from_str(&text).unwrap();
    // Null values are left out of the features
    assert!(document["features"][2]["properties"].get("area").is_none());

    let again = geojson::read(&json_path, &ReadOptions::default(), Some(&store)).unwrap();
    assert_eq!(again.num_rows(), 3);
    let area = again.column("area").unwrap().as_primitive::<Float64Type>();
    assert_eq!(area.value(1), 2.25);
    assert_eq!(
        string_column(&again.batch, "id").unwrap().unwrap()[0].as_deref(),
        Some("1")
    );
}

/// A single Feature document is read as a one-row dataset
#[test]
fn test_single_feature_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.geojson");
    let mut document = feature("a", square(0.0, 0.0, 2.0), json!({"area": 4.0}));
    document["schemas"] = json!({"fields": [VECOREL_SCHEMA]});
    write_json(&path, &document);

    let dataset = geojson::read(&path, &ReadOptions::default(), Some(&test_store())).unwrap();
    assert_eq!(dataset.num_rows(), 1);
    assert!(dataset.collection.get_schemas().unwrap().get("fields").is_some());
}
