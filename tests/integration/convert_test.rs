use serde_json::json;
use tempfile::tempdir;
use vecorel::commands::convert::{run, ConvertArgs};
use vecorel::commands::{SchemaArgs, WriteArgs};
use vecorel::config::ReadOptions;
use vecorel::frame::{batch_geometries, string_column};
use vecorel::geometry::GeometryType;
use vecorel::{read_dataset, validate, ValidatorConfig};

use crate::utils::{schema_pairs, test_store, write_json};

/// Self-intersecting polygon, a MultiPolygon, a 3D polygon and a LineString
fn source_document() -> serde_json::Value {
    let square = |x: f64| json!([[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]);
    json!({
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "id": "bowtie", "properties": {"crop": "wheat"},
             "geometry": {"type": "Polygon", "coordinates": [[[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0], [0.0, 0.0]]]}},
            {"type": "Feature", "id": "multi", "properties": {"crop": "maize"},
             "geometry": {"type": "MultiPolygon", "coordinates": [square(3.0), square(5.0)]}},
            {"type": "Feature", "id": "three-d", "properties": {"crop": "wheat"},
             "geometry": {"type": "Polygon", "coordinates": [[[7.0, 0.0, 5.0], [8.0, 0.0, 5.0], [8.0, 1.0, 5.0], [7.0, 0.0, 5.0]]]}},
            {"type": "Feature", "id": "road", "properties": {"crop": null},
             "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]}}
        ]
    })
}

fn convert_args(input: String, out: std::path::PathBuf, original_geometries: bool) -> ConvertArgs {
    ConvertArgs {
        dataset: "geojson".to_string(),
        out,
        input: vec![input],
        variant: None,
        cache: None,
        original_geometries,
        write: WriteArgs::default(),
        schemas: SchemaArgs {
            schema: schema_pairs(),
        },
    }
}

#[test]
fn test_convert_repairs_and_explodes() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.geojson");
    write_json(&source, &source_document());
    let out = dir.path().join("converted.parquet");

    run(&convert_args(source.display().to_string(), out.clone(), false)).unwrap();

    let store = test_store();
    let dataset = read_dataset(&out, &ReadOptions::default(), &store).unwrap();
    let geometries = batch_geometries(&dataset.batch).unwrap();
    assert!(geometries
        .iter()
        .flatten()
        .all(|g| GeometryType::from_geometry(g) == GeometryType::Polygon));

    let ids: Vec<String> = string_column(&dataset.batch, "id")
        .unwrap()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert!(ids.contains(&"multi-1".to_string()));
    assert!(ids.contains(&"multi-2".to_string()));
    assert!(ids.contains(&"three-d".to_string()));
    assert!(!ids.contains(&"road".to_string()));

    let report = validate(
        &out,
        &ValidatorConfig {
            data: true,
            ..ValidatorConfig::default()
        },
        &store,
    );
    assert!(report.is_valid(), "{:?}", report.issues);
}

#[test]
fn test_convert_keeps_original_geometries() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.geojson");
    write_json(&source, &source_document());
    let out = dir.path().join("original.parquet");

    run(&convert_args(source.display().to_string(), out.clone(), true)).unwrap();
    let dataset = read_dataset(&out, &ReadOptions::default(), &test_store()).unwrap();
    assert_eq!(dataset.num_rows(), 4);
}

#[test]
fn test_unknown_converter_fails() {
    let dir = tempdir().unwrap();
    let mut args = convert_args("x.geojson".to_string(), dir.path().join("x.parquet"), false);
    args.dataset = "no-such-converter".to_string();
    assert!(run(&args).is_err());
}
