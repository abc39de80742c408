use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::tempdir;
use vecorel::commands::describe::{run as describe, DescribeArgs};
use vecorel::commands::SchemaArgs;
use vecorel::config::{GeoParquetVersion, ReadOptions};
use vecorel::encoding::geoparquet::{self, inspect, write_options};
use vecorel::frame::string_column;
use vecorel::geometry::Crs;
use vecorel::ops::{merge, MergeOptions};
use vecorel::schema::{ResolveOptions, VECOREL_SCHEMA};
use vecorel::{read_dataset, validate, ValidatorConfig};

use crate::utils::{
    feature, feature_collection, schema_pairs, schemas_for, square, test_store, write_json,
    ADMIN_SCHEMA,
};

/// Collection `A` with two rows declaring the admin extension, `B` with one
/// core-only row
fn write_inputs(dir: &Path) -> Vec<PathBuf> {
    let a = dir.join("a.geojson");
    write_json(
        &a,
        &feature_collection(
            schemas_for("A", &[VECOREL_SCHEMA, ADMIN_SCHEMA]),
            vec![
                feature("a1", square(0.0, 0.0, 1.0), json!({"admin:country_code": "DE", "area": 1.0})),
                feature("a2", square(1.0, 0.0, 1.0), json!({"admin:country_code": "DE", "area": 1.0})),
            ],
        ),
    );
    let b = dir.join("b.geojson");
    write_json(
        &b,
        &feature_collection(
            schemas_for("B", &[VECOREL_SCHEMA]),
            vec![feature("b1", square(5.0, 5.0, 1.0), json!({"area": 2.0}))],
        ),
    );
    vec![a, b]
}

fn merge_inputs(dir: &Path) -> PathBuf {
    let store = test_store();
    let hydrated = ReadOptions::default().with_hydrate(true);
    let inputs = write_inputs(dir)
        .into_iter()
        .map(|path| {
            let dataset = read_dataset(&path, &hydrated, &store).unwrap();
            (path, dataset)
        })
        .collect();
    let merged = merge(inputs, &MergeOptions::default()).unwrap();
    let out = dir.join("merged.parquet");
    geoparquet::write(merged, &out, None, &write_options(GeoParquetVersion::V1_1), &store).unwrap();
    out
}

#[test]
fn test_merge_two_collections() {
    let dir = tempdir().unwrap();
    let out = merge_inputs(dir.path());
    let store = test_store();

    let dataset = read_dataset(&out, &ReadOptions::default(), &store).unwrap();
    assert_eq!(
        string_column(&dataset.batch, "collection").unwrap().unwrap(),
        vec![Some("A".to_string()), Some("A".to_string()), Some("B".to_string())]
    );

    let resolved = dataset.collection.resolve(&store, ResolveOptions::default()).unwrap();
    assert!(resolved.is_multi_collection());
    assert!(resolved.get("A").is_some());
    assert!(resolved.get("B").is_some());
    assert_eq!(resolved.extensions("A"), [ADMIN_SCHEMA.to_string()]);
    assert_eq!(inspect(&out).unwrap().num_rows, 3);

    let args = DescribeArgs {
        file: out,
        num: 3,
        column_types: true,
        schemas: SchemaArgs {
            schema: schema_pairs(),
        },
    };
    describe(&args).unwrap();
}

/// A property required by `A` may be absent from the rows of `B`
#[test]
fn test_property_required_by_one_collection() {
    let dir = tempdir().unwrap();
    let out = merge_inputs(dir.path());

    let report = validate(
        &out,
        &ValidatorConfig {
            data: true,
            ..ValidatorConfig::default()
        },
        &test_store(),
    );
    assert!(report.is_valid(), "{:?}", report.issues);

    let dataset = read_dataset(&out, &ReadOptions::default(), &test_store()).unwrap();
    let codes = string_column(&dataset.batch, "admin:country_code").unwrap().unwrap();
    assert_eq!(codes, vec![Some("DE".to_string()), Some("DE".to_string()), None]);
}

#[test]
fn test_merge_reprojects_to_target_crs() {
    let dir = tempdir().unwrap();
    let store = test_store();
    let inputs = write_inputs(dir.path())
        .into_iter()
        .map(|path| {
            let dataset = read_dataset(&path, &ReadOptions::default(), &store).unwrap();
            (path, dataset)
        })
        .collect();
    let options = MergeOptions {
        crs: "EPSG:3857".parse::<Crs>().unwrap(),
        exclude: vec!["area".to_string()],
        ..MergeOptions::default()
    };
    let merged = merge(inputs, &options).unwrap();
    assert_eq!(merged.crs, Crs::Epsg(3857));
    assert!(merged.column("area").is_none());
}
