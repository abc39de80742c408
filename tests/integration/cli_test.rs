use std::fs;

use serde_json::{json, Value};
use tempfile::tempdir;
use vecorel::commands::create_geojson::{self, CreateGeoJsonArgs};
use vecorel::commands::create_geoparquet::{self, CreateGeoParquetArgs};
use vecorel::commands::improve::{self, ImproveArgs};
use vecorel::commands::jsonschema::{self, JsonSchemaArgs};
use vecorel::commands::rename_extension::{self, RenameExtensionArgs};
use vecorel::commands::validate::{self, ValidateArgs};
use vecorel::commands::validate_schema::{self, ValidateSchemaArgs};
use vecorel::commands::{converters, SchemaArgs, WriteArgs};
use vecorel::config::ReadOptions;
use vecorel::encoding::geoparquet::inspect;
use vecorel::ops::improve::AREA_PROPERTY;
use vecorel::schema::VECOREL_SCHEMA;
use vecorel::read_dataset;

use crate::utils::{
    feature, feature_collection, sample_features, schema_pairs, schemas_for, square, test_data_dir,
    test_store, write_json,
};

fn schema_args() -> SchemaArgs {
    SchemaArgs {
        schema: schema_pairs(),
    }
}

fn validate_args(files: Vec<std::path::PathBuf>) -> ValidateArgs {
    ValidateArgs {
        files,
        data: true,
        num: None,
        required_schemas: Vec::new(),
        allow_mixed_versions: false,
        info: false,
        schemas: schema_args(),
    }
}

/// GeoJSON to GeoParquet, improve it, then back to per-feature GeoJSON
#[test]
fn test_create_improve_and_export() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("fields.geojson");
    write_json(
        &input,
        &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), sample_features()),
    );

    let parquet = dir.path().join("fields.parquet");
    create_geoparquet::run(&CreateGeoParquetArgs {
        files: vec![input],
        out: parquet.clone(),
        collection: None,
        properties: None,
        write: WriteArgs::default(),
        schemas: schema_args(),
    })
    .unwrap();
    validate::run(&validate_args(vec![parquet.clone()])).unwrap();

    let improved = dir.path().join("improved.parquet");
    improve::run(&ImproveArgs {
        file: parquet,
        out: Some(improved.clone()),
        rename: vec![("area".to_string(), "declared_area".to_string())],
        add_sizes: true,
        fix_geometries: false,
        explode_geometries: false,
        crs: None,
        write: WriteArgs::default(),
        schemas: schema_args(),
    })
    .unwrap();
    let info = inspect(&improved).unwrap();
    assert!(info.schema.field_with_name(AREA_PROPERTY).is_ok());
    assert!(info.schema.field_with_name("declared_area").is_ok());
    assert!(info.schema.field_with_name("area").is_err());
    validate::run(&validate_args(vec![improved.clone()])).unwrap();

    let features = dir.path().join("features");
    create_geojson::run(&CreateGeoJsonArgs {
        file: improved,
        out: features.clone(),
        features: true,
        num: Some(2),
        indent: Some(2),
        schemas: schema_args(),
    })
    .unwrap();
    assert!(features.join("collection.json").is_file());
    assert!(features.join("1.json").is_file());
    assert!(features.join("2.json").is_file());
    assert!(!features.join("3.json").exists());

    let dataset = read_dataset(&features, &ReadOptions::default(), &test_store()).unwrap();
    assert_eq!(dataset.num_rows(), 2);
}

#[test]
fn test_validate_fails_for_invalid_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.geojson");
    let features = vec![feature("1", square(0.0, 0.0, 1.0), json!({"area": -1.0}))];
    write_json(
        &path,
        &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), features),
    );
    assert!(validate::run(&validate_args(vec![path])).is_err());
}

#[test]
fn test_validate_schema_documents() {
    let dir = tempdir().unwrap();
    let args = ValidateSchemaArgs {
        files: vec![test_data_dir().join("core.yaml"), test_data_dir().join("admin.yaml")],
        metaschema: None,
    };
    validate_schema::run(&args).unwrap();

    let broken = dir.path().join("broken.yaml");
    fs::write(
        &broken,
        "$schema: https://vecorel.org/vecorel-schema/v0.1.0/schema.json\nproperties:\n  crop:\n    type: text\n",
    )
    .unwrap();
    let args = ValidateSchemaArgs {
        files: vec![broken],
        metaschema: None,
    };
    assert!(validate_schema::run(&args).is_err());
}

#[test]
fn test_jsonschema_output() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("feature.json");
    jsonschema::run(&JsonSchemaArgs {
        schema: VECOREL_SCHEMA.to_string(),
        datatypes: None,
        out: Some(out.clone()),
        id: Some("https://example.com/fields.json".to_string()),
        map: schema_pairs(),
    })
    .unwrap();

    let document: Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(document["$id"], "https://example.com/fields.json");
    assert_eq!(document["properties"]["type"]["const"], "Feature");
    assert!(document["properties"]["properties"]["properties"]["area"].is_object());
}

#[test]
fn test_rename_extension_template() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("README.md"),
        "# Template Extension\n\nhttps://github.com/vecorel/template-extension uses `template:field`\n",
    )
    .unwrap();

    rename_extension::run(&RenameExtensionArgs {
        folder: dir.path().to_path_buf(),
        title: "Crop".to_string(),
        slug: "crop-extension".to_string(),
        org: Some("fiboa".to_string()),
        prefix: None,
    })
    .unwrap();

    let text = fs::read_to_string(dir.path().join("README.md")).unwrap();
    assert_eq!(
        text,
        "# Crop\n\nhttps://github.com/fiboa/crop-extension uses `crop:field`\n"
    );
}

#[test]
fn test_list_converters() {
    converters::run(&converters::ConvertersArgs {
        providers: true,
        sources: true,
        verbose: true,
    })
    .unwrap();
}
