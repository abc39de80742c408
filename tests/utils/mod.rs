use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use vecorel::schema::{SchemaStore, VECOREL_SCHEMA};
use vecorel::SchemaMap;

/// URI of the administrative division extension
pub const ADMIN_SCHEMA: &str =
    "https://vecorel.org/administrative-division-extension/v0.1.0/schema.yaml";

/// Folder with the schema fixtures
#[must_use]
pub fn test_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("data")
}

/// `uri,path` pairs as given to `--schema`
#[must_use]
pub fn schema_pairs() -> Vec<String> {
    vec![
        format!("{VECOREL_SCHEMA},{}", test_data_dir().join("core.yaml").display()),
        format!("{ADMIN_SCHEMA},{}", test_data_dir().join("admin.yaml").display()),
    ]
}

#[must_use]
pub fn schema_map() -> SchemaMap {
    SchemaMap::from_pairs(schema_pairs()).expect("fixture pairs are well-formed")
}

/// A store resolving the fixture schemas from disk
#[must_use]
pub fn test_store() -> SchemaStore {
    SchemaStore::new(schema_map())
}

/// GeoJSON polygon of an axis-aligned square
#[must_use]
pub fn square(x: f64, y: f64, size: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x, y], [x + size, y], [x + size, y + size], [x, y + size], [x, y]]]
    })
}

#[must_use]
pub fn feature(id: &str, geometry: Value, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "id": id,
        "geometry": geometry,
        "properties": properties
    })
}

/// A FeatureCollection with the collection metadata at its top level
#[must_use]
pub fn feature_collection(collection: Value, features: Vec<Value>) -> Value {
    let mut document = json!({"type": "FeatureCollection", "features": features});
    if let (Some(doc), Value::Object(metadata)) = (document.as_object_mut(), collection) {
        for (key, value) in metadata {
            doc.insert(key, value);
        }
    }
    document
}

/// Collection metadata declaring the given schemas for one collection id
#[must_use]
pub fn schemas_for(id: &str, uris: &[&str]) -> Value {
    json!({"schemas": {id: uris}})
}

/// Three unit squares with an area and a determination timestamp
#[must_use]
pub fn sample_features() -> Vec<Value> {
    vec![
        feature(
            "1",
            square(0.0, 0.0, 1.0),
            json!({"area": 1.5, "determination_datetime": "2023-11-14T22:13:20Z"}),
        ),
        feature(
            "2",
            square(2.0, 0.0, 1.0),
            json!({"area": 2.25, "determination_datetime": "2023-11-14T22:14:20Z"}),
        ),
        feature("3", square(4.0, 0.0, 1.0), json!({})),
    ]
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).expect("serialisable"))
        .expect("writable test file");
}
