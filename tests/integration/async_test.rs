use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;
use vecorel::config::ReadOptions;
use vecorel::schema::VECOREL_SCHEMA;
use vecorel::{read_dataset_async, read_datasets_async};

use crate::utils::{feature, feature_collection, schemas_for, square, test_store, write_json};

/// Files are loaded concurrently and come back in input order
#[tokio::test]
async fn test_load_files_in_parallel() {
    let dir = tempdir().unwrap();
    let mut paths = Vec::new();
    for count in [3, 1, 2] {
        let features = (0..count)
            .map(|i| feature(&format!("{count}-{i}"), square(f64::from(i), 0.0, 1.0), json!({})))
            .collect();
        let path = dir.path().join(format!("part-{count}.geojson"));
        write_json(
            &path,
            &feature_collection(schemas_for("fields", &[VECOREL_SCHEMA]), features),
        );
        paths.push(path);
    }

    let store = Arc::new(test_store());
    let datasets = read_datasets_async(&paths, &ReadOptions::default(), store)
        .await
        .unwrap();
    let rows: Vec<usize> = datasets.iter().map(|(_, d)| d.num_rows()).collect();
    assert_eq!(rows, vec![3, 1, 2]);
    assert_eq!(datasets[1].0, paths[1]);
}

#[tokio::test]
async fn test_read_single_file_async() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("one.geojson");
    write_json(
        &path,
        &feature_collection(
            schemas_for("fields", &[VECOREL_SCHEMA]),
            vec![feature("a", square(0.0, 0.0, 1.0), json!({"area": 1.0}))],
        ),
    );
    let dataset = read_dataset_async(path, ReadOptions::default().with_num(1), Arc::new(test_store()))
        .await
        .unwrap();
    assert_eq!(dataset.num_rows(), 1);
    assert!(dataset.column("area").is_some());
}

#[tokio::test]
async fn test_one_broken_file_fails_the_load() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.geojson");
    write_json(
        &good,
        &feature_collection(
            schemas_for("fields", &[VECOREL_SCHEMA]),
            vec![feature("a", square(0.0, 0.0, 1.0), json!({}))],
        ),
    );
    let bad = dir.path().join("bad.geojson");
    std::fs::write(&bad, "{ not json").unwrap();

    let result = read_datasets_async(&[good, bad], &ReadOptions::default(), Arc::new(test_store())).await;
    assert!(result.is_err());
}
