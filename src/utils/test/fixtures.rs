//! Test fixtures
//!
//! A core schema and an administrative extension, registered in a
//! [`SchemaStore`] so no test touches the network.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType as ArrowType, Field, Schema};
use arrow::record_batch::RecordBatch;
use geo_types::Geometry;
use serde_json::{json, Value};

use crate::collection::Collection;
use crate::frame::{geometry_array, Dataset};
use crate::schema::{Document, SchemaStore, Schemas, VECOREL_SCHEMA};
use crate::types::timestamp_data_type;

use super::helpers::square;

/// URI of the administrative division extension
pub const ADMIN_SCHEMA: &str = "https://vecorel.org/administrative-division-extension/v0.1.0/schema.yaml";

/// Collection id of the sample dataset
pub const SAMPLE_COLLECTION: &str = "fields";

#[must_use]
pub fn core_schema() -> Value {
    json!({
        "$schema": "https://vecorel.org/vecorel-schema/v0.1.0/schema.json",
        "required": ["id", "geometry"],
        "properties": {
            "id": {"type": "string", "minLength": 1},
            "collection": {"type": "string", "minLength": 1},
            "geometry": {"type": "geometry", "geometryTypes": ["Polygon"]},
            "bbox": {"type": "bounding-box"},
            "area": {"type": "double", "exclusiveMinimum": 0},
            "determination_datetime": {"type": "date-time"}
        }
    })
}

#[must_use]
pub fn admin_schema() -> Value {
    json!({
        "$schema": "https://vecorel.org/vecorel-schema/v0.1.0/schema.json",
        "required": ["admin:country_code"],
        "properties": {
            "admin:country_code": {"type": "string", "maxLength": 2, "pattern": "^[A-Z]{2}$"},
            "admin:subdivision_code": {"type": "string"}
        },
        "collection": {"admin:country_code": true}
    })
}

/// A store that serves the core schema and the administrative extension
#[must_use]
pub fn test_store() -> SchemaStore {
    let store = SchemaStore::default();
    store.insert(VECOREL_SCHEMA, Document::Structured(core_schema()));
    store.insert(ADMIN_SCHEMA, Document::Structured(admin_schema()));
    store
}

/// Three unit squares with an area and a determination timestamp
#[must_use]
pub fn sample_dataset() -> Dataset {
    let geometries: Vec<Option<Geometry<f64>>> = [0.0, 2.0, 4.0]
        .iter()
        .map(|x| Some(Geometry::Polygon(square(*x, 0.0, 1.0))))
        .collect();
    let timestamps = TimestampMillisecondArray::from(vec![
        Some(1_700_000_000_000),
        Some(1_700_000_060_000),
        None,
    ])
    .with_timezone("UTC");

    let schema = Schema::new(vec![
        Field::new("id", ArrowType::Utf8, false),
        Field::new("geometry", ArrowType::Binary, false),
        Field::new("area", ArrowType::Float64, true),
        Field::new("determination_datetime", timestamp_data_type(), true),
    ]);
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["1", "2", "3"])),
        geometry_array(&geometries),
        Arc::new(Float64Array::from(vec![Some(1.5), Some(2.25), None])),
        Arc::new(timestamps),
    ];
    // Fixture data is well-formed by construction
    let batch = RecordBatch::try_new(Arc::new(schema), columns).unwrap();
    Dataset::new(Collection::with_schemas(&Schemas::with_core(SAMPLE_COLLECTION)), batch)
}
