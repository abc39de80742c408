//! GeoJSON encoding.
//!
//! A FeatureCollection carries the collection metadata flat at its top level
//! (`schemas`, `schemas:custom`, user metadata). In per-feature mode every
//! feature is written to `{id}.json` and the collection to `collection.json`
//! in the same directory; each feature names its collection id in a
//! top-level `collection` member.

use std::fmt;
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::array::ArrayRef;
use arrow::datatypes::Field;
use arrow::record_batch::RecordBatch;
use geo_types::Geometry;
use indexmap::IndexSet;
use rustc_hash::FxHashSet;
use serde::de::{DeserializeSeed, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::collection::{Collection, COLLECTION_COLUMN};
use crate::config::{GeoJsonOptions, ReadOptions};
use crate::error::util::{safe_create_file, safe_open_file, safe_read_to_string};
use crate::error::{Result, VecorelError};
use crate::frame::json::{build_array, column_values, infer_type, strip_nulls, NULL};
use crate::frame::{
    batch_from_columns, batch_geometries, decode_dictionaries, geometry_array, repeat_string,
    with_column, Dataset, BBOX_COLUMN, GEOMETRY_COLUMN,
};
use crate::geometry::crs::Transformer;
use crate::geometry::{geojson as geometry_json, Crs};
use crate::schema::{ResolveOptions, SchemaStore, VecorelSchema};
use crate::types::{frame_field, DataType, BBOX_FIELDS};
use crate::utils::logging::{
    create_main_progress_bar, finish_and_clear, log_operation_complete, log_operation_start,
    log_warning,
};

/// File holding the collection in per-feature mode
pub const COLLECTION_FILE: &str = "collection.json";

/// Members of a Feature object that are not collection metadata
const FEATURE_MEMBERS: [&str; 6] = ["type", "id", "geometry", "properties", "bbox", "collection"];

/// Streams the `features` array, keeping at most `limit` features and only
/// the requested properties of each
#[derive(Clone, Copy)]
struct FeatureSeq<'a> {
    limit: Option<usize>,
    properties: Option<&'a [String]>,
}

impl FeatureSeq<'_> {
    fn project(&self, mut feature: Value) -> Value {
        if let (Some(keep), Some(Value::Object(properties))) =
            (self.properties, feature.get_mut("properties"))
        {
            properties.retain(|k, _| keep.iter().any(|p| p == k));
        }
        feature
    }
}

impl<'de> DeserializeSeed<'de> for FeatureSeq<'_> {
    type Value = Vec<Value>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_seq(self)
    }
}

impl<'de> Visitor<'de> for FeatureSeq<'_> {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an array of GeoJSON features")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
        let mut features = Vec::new();
        while self.limit.is_none_or(|n| features.len() < n) {
            match seq.next_element::<Value>()? {
                Some(feature) => features.push(self.project(feature)),
                None => return Ok(features),
            }
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(features)
    }
}

/// Top-level members of a GeoJSON document; `features` is streamed
struct RawDocument {
    members: Map<String, Value>,
    features: Option<Vec<Value>>,
}

struct DocumentSeed<'a>(FeatureSeq<'a>);

impl<'de> DeserializeSeed<'de> for DocumentSeed<'_> {
    type Value = RawDocument;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for DocumentSeed<'_> {
    type Value = RawDocument;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a GeoJSON Feature or FeatureCollection")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let mut members = Map::new();
        let mut features = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "features" {
                features = Some(map.next_value_seed(self.0)?);
            } else {
                members.insert(key, map.next_value()?);
            }
        }
        Ok(RawDocument { members, features })
    }
}

fn parse_document(path: &Path, seq: FeatureSeq<'_>) -> Result<RawDocument> {
    let file = safe_open_file(path, "GeoJSON file")?;
    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(file));
    let document = DocumentSeed(seq)
        .deserialize(&mut deserializer)
        .map_err(|e| VecorelError::Other(format!("Invalid GeoJSON in {}: {e}", path.display())))?;
    deserializer.end()?;
    Ok(document)
}

/// Split a document into collection metadata and features; a lone Feature
/// is promoted to a single-feature collection
fn split_document(document: RawDocument, path: &Path) -> Result<(Map<String, Value>, Vec<Value>)> {
    let RawDocument { mut members, features } = document;
    if let Some(features) = features {
        members.shift_remove("type");
        members.shift_remove("bbox");
        return Ok((members, features));
    }
    if members.get("type").and_then(Value::as_str) != Some("Feature") {
        return Err(VecorelError::Other(format!(
            "{} is neither a GeoJSON Feature nor a FeatureCollection",
            path.display()
        )));
    }
    let (feature, metadata): (Map<String, Value>, Map<String, Value>) = members
        .into_iter()
        .partition(|(k, _)| FEATURE_MEMBERS.contains(&k.as_str()));
    Ok((metadata, vec![Value::Object(feature)]))
}

fn sibling_collection(path: &Path) -> Option<PathBuf> {
    let candidate = path.with_file_name(COLLECTION_FILE);
    (candidate != path && candidate.is_file()).then_some(candidate)
}

fn read_collection_file(path: &Path) -> Result<Collection> {
    Collection::from_json(&safe_read_to_string(path, "collection file")?)
        .map_err(|e| e.context(format!("Invalid collection in {}", path.display())))
}

/// Features of a per-feature directory, in file name order
fn read_feature_dir(dir: &Path, seq: FeatureSeq<'_>) -> Result<(Collection, Vec<Value>)> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| VecorelError::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.extension().is_some_and(|e| e == "json" || e == "geojson")
                && p.file_name().is_some_and(|n| n != COLLECTION_FILE)
        })
        .collect();
    files.sort();
    if let Some(limit) = seq.limit {
        files.truncate(limit);
    }

    let collection_path = dir.join(COLLECTION_FILE);
    let collection = if collection_path.is_file() {
        read_collection_file(&collection_path)?
    } else {
        log_warning("No collection.json next to the features", Some(dir));
        Collection::new()
    };

    let features = files
        .iter()
        .map(|file| {
            let text = safe_read_to_string(file, "GeoJSON feature")?;
            let feature: Value = serde_json::from_str(&text)?;
            Ok(seq.project(feature))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((collection, features))
}

/// GeoJSON ids may be numbers, properties store them as strings
fn id_property(id: &Value) -> Value {
    match id {
        Value::Number(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

/// Turn features into a batch; declared properties take their dataframe
/// type from the schema, all others are inferred
pub fn features_to_batch(features: &[Value], schema: Option<&VecorelSchema>) -> Result<RecordBatch> {
    let mut rows: Vec<Map<String, Value>> = Vec::with_capacity(features.len());
    let mut geoms: Vec<Option<Geometry<f64>>> = Vec::with_capacity(features.len());
    let mut names: IndexSet<String> = IndexSet::new();
    names.insert("id".to_string());
    names.insert(GEOMETRY_COLUMN.to_string());

    for feature in features {
        let mut properties = match feature.get("properties") {
            Some(Value::Object(p)) => p.clone(),
            _ => Map::new(),
        };
        if let Some(id) = feature.get("id").filter(|v| !v.is_null()) {
            properties.entry("id").or_insert_with(|| id_property(id));
        }
        if let Some(collection) = feature.get(COLLECTION_COLUMN).filter(|v| v.is_string()) {
            properties
                .entry(COLLECTION_COLUMN)
                .or_insert_with(|| collection.clone());
        }
        properties.shift_remove(BBOX_COLUMN);

        geoms.push(match feature.get("geometry") {
            None | Some(Value::Null) => None,
            Some(value) => Some(geometry_json::from_value(value)?),
        });
        names.extend(properties.keys().cloned());
        rows.push(properties);
    }

    let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(names.len());
    for name in &names {
        if name == GEOMETRY_COLUMN {
            columns.push((name.clone(), geometry_array(&geoms)));
            continue;
        }
        let values: Vec<&Value> = rows.iter().map(|r| r.get(name).unwrap_or(&NULL)).collect();
        if name == "id" && values.iter().all(|v| v.is_null()) {
            continue;
        }
        let declared = schema.and_then(|s| s.property(name));
        let array = match declared {
            Some(property) if property.data_type == Some(DataType::Geometry) => {
                let parsed = values
                    .iter()
                    .map(|v| match v {
                        Value::Null => Ok(None),
                        other => geometry_json::from_value(other).map(Some),
                    })
                    .collect::<Result<Vec<_>>>()?;
                geometry_array(&parsed)
            }
            Some(property) => build_array(&frame_field(name, property, false)?, &values)?,
            None => build_array(&Field::new(name, infer_type(&values), true), &values)?,
        };
        columns.push((name.clone(), array));
    }
    batch_from_columns(columns)
}

/// Collection and raw features of a GeoJSON file or per-feature directory.
///
/// A lone Feature without collection members picks up a `collection.json`
/// next to it.
pub fn read_features(path: &Path, options: &ReadOptions) -> Result<(Collection, Vec<Value>)> {
    let seq = FeatureSeq {
        limit: options.num,
        properties: options.properties.as_deref(),
    };
    if path.is_dir() {
        return read_feature_dir(path, seq);
    }
    let (metadata, features) = split_document(parse_document(path, seq)?, path)?;
    let collection = match sibling_collection(path) {
        Some(file) if metadata.is_empty() => read_collection_file(&file)?,
        _ => Collection::from_value(Value::Object(metadata))?,
    };
    Ok((collection, features))
}

/// Read a GeoJSON FeatureCollection, a lone Feature, or a per-feature
/// directory.
///
/// With a store, column types follow the resolved schemas; if they cannot
/// be resolved the types are inferred from the values.
pub fn read(path: &Path, options: &ReadOptions, store: Option<&SchemaStore>) -> Result<Dataset> {
    let start = Instant::now();
    log_operation_start("Reading GeoJSON", path);
    let (collection, features) = read_features(path, options)?;

    let schema = match store {
        Some(store) if !collection.is_empty() => {
            match collection.resolve(store, ResolveOptions::default()) {
                Ok(resolved) => Some(resolved.merged()),
                Err(e) => {
                    log::debug!("Inferring GeoJSON column types: {e}");
                    None
                }
            }
        }
        _ => None,
    };

    let batch = features_to_batch(&features, schema.as_ref())?;
    log_operation_complete("read", path, batch.num_rows(), start.elapsed());
    Ok(Dataset::new(collection, batch))
}

fn bbox_member(value: &Value) -> Option<Value> {
    let object = value.as_object()?;
    let coords = BBOX_FIELDS
        .iter()
        .map(|k| object.get(*k).cloned())
        .collect::<Option<Vec<Value>>>()?;
    Some(Value::Array(coords))
}

/// Build GeoJSON features from the rows of a batch in EPSG:4326.
///
/// `collection_member` moves the `collection` property to the top level of
/// each feature.
fn to_features(
    batch: &RecordBatch,
    geoms: &[Option<Geometry<f64>>],
    collection_member: bool,
) -> Result<Vec<Map<String, Value>>> {
    let schema = batch.schema();
    let mut columns: Vec<(&str, Vec<Value>)> = Vec::with_capacity(batch.num_columns());
    for (field, column) in schema.fields().iter().zip(batch.columns()) {
        if field.name() != GEOMETRY_COLUMN {
            columns.push((field.name().as_str(), column_values(column.as_ref())?));
        }
    }

    let features = (0..batch.num_rows())
        .map(|row| {
            let mut feature = Map::new();
            feature.insert("type".to_string(), Value::String("Feature".to_string()));
            let mut properties = Map::new();
            for (name, values) in &columns {
                let value = values[row].clone();
                match *name {
                    "id" => {
                        if !value.is_null() {
                            feature.insert("id".to_string(), value);
                        }
                    }
                    BBOX_COLUMN => {
                        if let Some(bbox) = bbox_member(&value) {
                            feature.insert("bbox".to_string(), bbox);
                        }
                    }
                    COLLECTION_COLUMN if collection_member => {
                        if !value.is_null() {
                            feature.insert(COLLECTION_COLUMN.to_string(), value);
                        }
                    }
                    _ => {
                        properties.insert((*name).to_string(), value);
                    }
                }
            }
            let geometry = geoms[row].as_ref().map_or(Value::Null, geometry_json::to_value);
            feature.insert("geometry".to_string(), geometry);
            feature.insert("properties".to_string(), strip_nulls(Value::Object(properties)));
            feature
        })
        .collect();
    Ok(features)
}

fn write_json(path: &Path, value: &Value, indent: Option<usize>) -> Result<()> {
    let file = safe_create_file(path, "GeoJSON file")?;
    let mut writer = BufWriter::new(file);
    match indent {
        Some(width) => {
            let pad = vec![b' '; width];
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(&pad));
            value.serialize(&mut serializer)?;
        }
        None => serde_json::to_writer(&mut writer, value)?,
    }
    writer.flush().map_err(|e| VecorelError::io(path, e))
}

/// File name for a feature id
fn feature_file_name(id: Option<&Value>, row: usize) -> String {
    let stem = match id {
        Some(Value::String(s)) => s.replace(['/', '\\', ':'], "_"),
        Some(Value::Number(n)) => n.to_string(),
        _ => row.to_string(),
    };
    format!("{stem}.json")
}

/// File names of all features; two features must not share a file
fn feature_file_names(features: &[Map<String, Value>]) -> Result<Vec<String>> {
    let mut seen = FxHashSet::default();
    seen.insert(COLLECTION_FILE.to_string());
    features
        .iter()
        .enumerate()
        .map(|(row, feature)| {
            let name = feature_file_name(feature.get("id"), row);
            if seen.insert(name.clone()) {
                Ok(name)
            } else {
                Err(VecorelError::Value(format!(
                    "Feature id of row {row} maps to {name}, which is already taken"
                )))
            }
        })
        .collect()
}

/// Write a dataset as GeoJSON, reprojected to EPSG:4326.
///
/// Returns the number of features written.
pub fn write(dataset: &Dataset, path: &Path, options: &GeoJsonOptions) -> Result<usize> {
    let start = Instant::now();
    log_operation_start("Writing GeoJSON", path);

    let mut batch = decode_dictionaries(&dataset.batch)?;
    if let Some(num) = options.num {
        batch = batch.slice(0, num.min(batch.num_rows()));
    }
    let mut geoms = match batch.column_by_name(GEOMETRY_COLUMN) {
        Some(_) => batch_geometries(&batch)?,
        None => vec![None; batch.num_rows()],
    };
    if let Some(transformer) = Transformer::new(&dataset.crs, &Crs::WGS84)? {
        log::debug!("Reprojecting from {} to {}", dataset.crs, Crs::WGS84);
        for geom in geoms.iter_mut().flatten() {
            transformer.transform(geom)?;
        }
    }

    if !options.features {
        let features = to_features(&batch, &geoms, false)?;
        let count = features.len();
        let mut document = Map::new();
        document.insert("type".to_string(), Value::String("FeatureCollection".to_string()));
        for (key, value) in dataset.collection.iter() {
            document.insert(key.clone(), value.clone());
        }
        document.insert(
            "features".to_string(),
            Value::Array(features.into_iter().map(Value::Object).collect()),
        );
        write_json(path, &Value::Object(document), options.indent)?;
        log_operation_complete("wrote", path, count, start.elapsed());
        return Ok(count);
    }

    let ids = Dataset::new(dataset.collection.clone(), batch.clone()).collection_ids()?;
    let with_ids = match (batch.column_by_name(COLLECTION_COLUMN), ids.first()) {
        (None, Some(Some(id))) => with_column(
            &batch,
            Field::new(COLLECTION_COLUMN, arrow::datatypes::DataType::Utf8, true),
            repeat_string(id, batch.num_rows()),
        )?,
        _ => batch,
    };
    let features = to_features(&with_ids, &geoms, true)?;
    let names = feature_file_names(&features)?;

    fs::create_dir_all(path).map_err(|e| VecorelError::io(path, e))?;
    write_json(
        &path.join(COLLECTION_FILE),
        &dataset.collection.to_value(),
        options.indent,
    )?;

    let progress = create_main_progress_bar(features.len() as u64, Some("Writing features"));
    for (name, feature) in names.iter().zip(&features) {
        write_json(&path.join(name), &Value::Object(feature.clone()), options.indent)?;
        progress.inc(1);
    }
    finish_and_clear(&progress);

    log_operation_complete("wrote", path, features.len(), start.elapsed());
    Ok(features.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::utils::test::{sample_dataset, test_store};
    use arrow::array::AsArray;
    use arrow::datatypes::{DataType as ArrowType, TimeUnit};
    use serde_json::json;

    fn write_text(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_feature_collection_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fields.json");
        write(&sample_dataset(), &path, &GeoJsonOptions::default()).unwrap();

        let document: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(document["type"], "FeatureCollection");
        assert!(document["schemas"]["fields"].is_array());
        let features = document["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["id"], "1");
        assert!(features[0]["properties"].get("id").is_none());
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["properties"]["determination_datetime"], "2023-11-14T22:13:20Z");
        assert!(features[2]["properties"].get("area").is_none());
        assert!(features[2]["properties"].get("determination_datetime").is_none());
    }

    #[test]
    fn test_round_trip_with_schema_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fields.geojson");
        let original = sample_dataset();
        write(&original, &path, &GeoJsonOptions::default()).unwrap();

        let dataset = read(&path, &ReadOptions::default(), Some(&test_store())).unwrap();
        assert_eq!(dataset.num_rows(), 3);
        assert_eq!(
            dataset.batch.schema().field_with_name("determination_datetime").unwrap().data_type(),
            &ArrowType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
        );
        for name in ["id", "geometry", "area", "determination_datetime"] {
            assert_eq!(
                dataset.column(name).unwrap().as_ref(),
                original.column(name).unwrap().as_ref(),
                "column {name}"
            );
        }
    }

    #[test]
    fn test_lone_feature_is_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_text(
            dir.path(),
            "one.json",
            &json!({
                "type": "Feature",
                "id": 7,
                "schemas": {"c": ["https://vecorel.org/specification/v0.1.0/schema.yaml"]},
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                "properties": {"name": "x"}
            }),
        );
        let dataset = read(&path, &ReadOptions::default(), None).unwrap();
        assert_eq!(dataset.num_rows(), 1);
        assert!(dataset.collection.get("schemas").is_some());
        let ids = dataset.column("id").unwrap().as_string::<i32>();
        assert_eq!(ids.value(0), "7");
        assert_eq!(dataset.column_names(), vec!["id", "geometry", "name"]);
    }

    #[test]
    fn test_streaming_limit_and_properties() {
        let dir = tempfile::tempdir().unwrap();
        let features: Vec<Value> = (0..5)
            .map(|i| {
                json!({
                    "type": "Feature",
                    "id": format!("f{i}"),
                    "geometry": null,
                    "properties": {"a": i, "b": "skip"}
                })
            })
            .collect();
        let path = write_text(
            dir.path(),
            "many.json",
            &json!({"type": "FeatureCollection", "features": features, "title": "t"}),
        );
        let options = ReadOptions {
            num: Some(2),
            properties: Some(vec!["a".to_string()]),
            hydrate: false,
        };
        let dataset = read(&path, &options, None).unwrap();
        assert_eq!(dataset.num_rows(), 2);
        assert_eq!(dataset.column_names(), vec!["id", "geometry", "a"]);
        assert_eq!(dataset.collection.get("title"), Some(&json!("t")));
    }

    #[test]
    fn test_per_feature_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("features");
        let options = GeoJsonOptions {
            features: true,
            num: Some(2),
            indent: Some(2),
        };
        assert_eq!(write(&sample_dataset(), &out, &options).unwrap(), 2);
        assert!(out.join(COLLECTION_FILE).is_file());
        let feature: Value =
            serde_json::from_str(&fs::read_to_string(out.join("1.json")).unwrap()).unwrap();
        assert_eq!(feature["collection"], "fields");
        assert!(!out.join("3.json").exists());

        let dataset = read(&out, &ReadOptions::default(), Some(&test_store())).unwrap();
        assert_eq!(dataset.num_rows(), 2);
        assert!(dataset.collection.get("schemas").is_some());
        assert!(dataset.column(COLLECTION_COLUMN).is_some());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("features");
        let mut dataset = sample_dataset();
        let ids: ArrayRef = Arc::new(arrow::array::StringArray::from(vec!["a", "b", "a"]));
        dataset.batch = with_column(&dataset.batch, Field::new("id", ArrowType::Utf8, false), ids).unwrap();
        let options = GeoJsonOptions {
            features: true,
            ..GeoJsonOptions::default()
        };
        let err = write(&dataset, &out, &options).unwrap_err();
        assert!(err.to_string().contains("a.json"), "{err}");
        assert!(!out.exists());
    }

    #[test]
    fn test_feature_named_collection_is_rejected() {
        let features = vec![Map::from_iter([("id".to_string(), json!("collection"))])];
        assert!(feature_file_names(&features).is_err());
    }

    #[test]
    fn test_reprojects_to_wgs84() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merc.json");
        let mut dataset = sample_dataset().with_crs(Crs::Epsg(3857));
        let point: Geometry<f64> = geo_types::point!(x: 111_319.490_793, y: 0.0).into();
        dataset.batch = with_column(
            &dataset.batch,
            Field::new(GEOMETRY_COLUMN, ArrowType::Binary, true),
            geometry_array(&[Some(point.clone()), Some(point.clone()), Some(point)]),
        )
        .unwrap();
        write(&dataset, &path, &GeoJsonOptions::default()).unwrap();
        let document: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let x = document["features"][0]["geometry"]["coordinates"][0].as_f64().unwrap();
        assert!((x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_bbox_member() {
        let value = json!({"xmin": 0.0, "ymin": 1.0, "xmax": 2.0, "ymax": 3.0});
        assert_eq!(bbox_member(&value), Some(json!([0.0, 1.0, 2.0, 3.0])));
        assert_eq!(bbox_member(&Value::Null), None);
    }
}
