//! Row-level value checks of a hydrated dataset.
//!
//! Every column is checked independently (and in parallel) against the schema
//! of each row's collection. Geometries are checked for validity and type,
//! bounding boxes for ordering, everything else through the JSON Schema of
//! the property.

use arrow::array::Array;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::frame::json::column_values;
use crate::frame::{bbox_values, geometries, Dataset};
use crate::geometry::ops::invalidity_reason;
use crate::geometry::GeometryType;
use crate::jsonschema::{property_schema, Evaluator};
use crate::schema::{PropertySchema, ResolvedSchemas, VecorelSchema};
use crate::types::DataType;

use super::columnar::allowed_geometry_types;
use super::{strip_unsupported_unique, unique_items_note, Issue, Level, Report};

/// Row issues reported per column before the rest are summarised
pub const MAX_ROW_ISSUES: usize = 100;

/// Check all values of a dataset, adding the findings to the report
pub fn check(dataset: &Dataset, resolved: &ResolvedSchemas, report: &mut Report) -> Result<()> {
    let merged = resolved.merged();
    let ids = dataset.collection_ids()?;
    let schema = dataset.batch.schema();

    let columns: Vec<(&str, &dyn Array)> = schema
        .fields()
        .iter()
        .zip(dataset.batch.columns())
        .filter(|(field, _)| merged.property(field.name()).is_some())
        .map(|(field, column)| (field.name().as_str(), column.as_ref()))
        .collect();

    let results: Vec<Result<Vec<Issue>>> = columns
        .par_iter()
        .map(|(name, column)| {
            let checker = ColumnChecker {
                name,
                ids: &ids,
                resolved,
                merged: &merged,
            };
            checker.check(*column)
        })
        .collect();

    for issues in results {
        report.extend(issues?);
    }
    Ok(())
}

struct ColumnChecker<'a> {
    name: &'a str,
    ids: &'a [Option<String>],
    resolved: &'a ResolvedSchemas,
    merged: &'a VecorelSchema,
}

impl<'a> ColumnChecker<'a> {
    /// Schema that applies to rows of a collection; unknown ids fall back to
    /// the merged view
    fn schema_for(&self, id: Option<&str>) -> &'a VecorelSchema {
        id.and_then(|id| self.resolved.get(id)).unwrap_or(self.merged)
    }

    fn property_for(&self, id: Option<&str>) -> Option<&'a PropertySchema> {
        self.schema_for(id).property(self.name)
    }

    fn check(&self, column: &dyn Array) -> Result<Vec<Issue>> {
        let mut issues = Issues::new(self.name);
        let data_type = self.merged.property(self.name).and_then(|p| p.data_type);
        match data_type {
            Some(DataType::Geometry) => self.check_geometries(column, &mut issues)?,
            Some(DataType::BoundingBox) => self.check_bboxes(column, &mut issues)?,
            _ => self.check_values(column, &mut issues)?,
        }
        Ok(issues.finish())
    }

    fn check_values(&self, column: &dyn Array, issues: &mut Issues) -> Result<()> {
        let values = column_values(column)?;
        let mut evaluators: FxHashMap<Option<&str>, Option<Evaluator>> = FxHashMap::default();

        for (row, value) in values.iter().enumerate() {
            let id = self.ids.get(row).and_then(|id| id.as_deref());
            if !evaluators.contains_key(&id) {
                let evaluator = self.evaluator(id, issues);
                evaluators.insert(id, evaluator);
            }
            let Some(Some(evaluator)) = evaluators.get(&id) else {
                continue;
            };
            for error in evaluator.validate(value) {
                issues.error(format!("row {row}: {error}"));
            }
        }
        Ok(())
    }

    fn evaluator(&self, id: Option<&str>, issues: &mut Issues) -> Option<Evaluator> {
        let mut prop = self.property_for(id)?.clone();
        if strip_unsupported_unique(&mut prop) {
            issues.note(unique_items_note(self.name));
        }
        let nullable = !self.schema_for(id).is_required(self.name);
        match Evaluator::new(property_schema(&prop, nullable)) {
            Ok(evaluator) => Some(evaluator),
            Err(e) => {
                issues.error(format!("cannot check values: {e}"));
                None
            }
        }
    }

    fn check_geometries(&self, column: &dyn Array, issues: &mut Issues) -> Result<()> {
        let geometries = match geometries(column) {
            Ok(geometries) => geometries,
            Err(e) => {
                issues.error(e.to_string());
                return Ok(());
            }
        };
        let mut allowed: FxHashMap<Option<&str>, Vec<GeometryType>> = FxHashMap::default();

        for (row, geometry) in geometries.iter().enumerate() {
            let id = self.ids.get(row).and_then(|id| id.as_deref());
            let Some(geometry) = geometry else {
                if self.schema_for(id).is_required(self.name) {
                    issues.error(format!("row {row}: geometry is required"));
                }
                continue;
            };
            if let Some(reason) = invalidity_reason(geometry) {
                issues.error(format!("row {row}: invalid geometry ({reason})"));
            }
            let allowed = allowed.entry(id).or_insert_with(|| {
                self.property_for(id)
                    .map(allowed_geometry_types)
                    .unwrap_or_default()
            });
            let geometry_type = GeometryType::from_geometry(geometry);
            if !allowed.is_empty() && !allowed.contains(&geometry_type) {
                issues.error(format!(
                    "row {row}: geometry type {geometry_type} is not allowed"
                ));
            }
        }
        Ok(())
    }

    fn check_bboxes(&self, column: &dyn Array, issues: &mut Issues) -> Result<()> {
        let boxes = match bbox_values(column) {
            Ok(boxes) => boxes,
            Err(e) => {
                issues.error(e.to_string());
                return Ok(());
            }
        };
        for (row, bbox) in boxes.iter().enumerate() {
            if let Some(bbox) = bbox.filter(|b| !b.is_ordered()) {
                issues.error(format!(
                    "row {row}: bounding box [{}, {}, {}, {}] must have xmin <= xmax and ymin <= ymax",
                    bbox.xmin, bbox.ymin, bbox.xmax, bbox.ymax
                ));
            }
        }
        Ok(())
    }
}

/// Issues of one column, capped at [`MAX_ROW_ISSUES`] errors
struct Issues<'a> {
    column: &'a str,
    issues: Vec<Issue>,
    errors: usize,
    noted: bool,
}

impl<'a> Issues<'a> {
    fn new(column: &'a str) -> Self {
        Self {
            column,
            issues: Vec::new(),
            errors: 0,
            noted: false,
        }
    }

    fn error(&mut self, message: String) {
        self.errors += 1;
        if self.errors <= MAX_ROW_ISSUES {
            self.issues.push(Issue {
                level: Level::Error,
                message: format!("{}, {message}", self.column),
            });
        }
    }

    /// Informational note, kept once per column
    fn note(&mut self, message: String) {
        if !self.noted {
            self.noted = true;
            self.issues.push(Issue {
                level: Level::Info,
                message,
            });
        }
    }

    fn finish(mut self) -> Vec<Issue> {
        if self.errors > MAX_ROW_ISSUES {
            self.issues.push(Issue {
                level: Level::Error,
                message: format!(
                    "{}: {} more invalid values not listed",
                    self.column,
                    self.errors - MAX_ROW_ISSUES
                ),
            });
        }
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, ListArray, StringArray, StructArray};
    use arrow::datatypes::{DataType as ArrowType, Field, Fields};
    use geo_types::{polygon, Geometry};
    use serde_json::json;

    use crate::collection::Collection;
    use crate::frame::{geometry_array, with_column};
    use crate::schema::{ResolveOptions, Schemas, SchemaStore, Document, VECOREL_SCHEMA};
    use crate::types::bbox_data_type;
    use crate::utils::test::{core_schema, sample_dataset, test_store};

    fn run(dataset: &Dataset, store: &SchemaStore) -> Report {
        let resolved = dataset.collection.resolve(store, ResolveOptions::default()).unwrap();
        let mut report = Report::new(Path::new("x.parquet"));
        check(dataset, &resolved, &mut report).unwrap();
        report
    }

    #[test]
    fn test_sample_values_are_valid() {
        let report = run(&sample_dataset(), &test_store());
        assert!(report.is_valid(), "{:?}", report.issues);
    }

    #[test]
    fn test_out_of_range_area() {
        let mut dataset = sample_dataset();
        let batch = crate::frame::drop_columns(&dataset.batch, &["area"]).unwrap();
        dataset.batch = with_column(
            &batch,
            Field::new("area", ArrowType::Float64, true),
            Arc::new(Float64Array::from(vec![Some(1.0), Some(-2.0), Some(0.0)])) as ArrayRef,
        )
        .unwrap();
        let report = run(&dataset, &test_store());
        assert_eq!(report.error_count(), 2);
        assert!(report.errors().all(|e| e.starts_with("area, row ")));
    }

    #[test]
    fn test_unordered_bbox_is_an_error() {
        let mut dataset = sample_dataset();
        let fields = match bbox_data_type() {
            ArrowType::Struct(fields) => fields,
            _ => Fields::empty(),
        };
        let column = |values: [f64; 3]| Arc::new(Float64Array::from(values.to_vec())) as ArrayRef;
        let bbox = StructArray::new(
            fields.clone(),
            vec![
                column([0.0, 5.0, 4.0]),
                column([0.0, 0.0, 0.0]),
                column([1.0, 3.0, 5.0]),
                column([1.0, 1.0, 1.0]),
            ],
            None,
        );
        dataset.batch = with_column(
            &dataset.batch,
            Field::new("bbox", ArrowType::Struct(fields), true),
            Arc::new(bbox) as ArrayRef,
        )
        .unwrap();
        let report = run(&dataset, &test_store());
        assert_eq!(report.error_count(), 1);
        assert!(report.errors().next().unwrap().starts_with("bbox, row 1"));
    }

    #[test]
    fn test_invalid_geometry_reports_reason() {
        let mut dataset = sample_dataset();
        let bowtie = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]);
        let batch = crate::frame::drop_columns(&dataset.batch, &["geometry"]).unwrap();
        let mut geometries = crate::frame::batch_geometries(&dataset.batch).unwrap();
        geometries[0] = Some(bowtie);
        dataset.batch = with_column(
            &batch,
            Field::new("geometry", ArrowType::Binary, false),
            geometry_array(&geometries),
        )
        .unwrap();
        let report = run(&dataset, &test_store());
        assert_eq!(report.error_count(), 1);
        assert!(report.errors().next().unwrap().contains("invalid geometry"));
    }

    #[test]
    fn test_unique_items_on_objects_is_noted() {
        let mut core = core_schema();
        core["properties"]["tags"] = json!({
            "type": "array",
            "uniqueItems": true,
            "items": {"type": "object"}
        });
        let store = SchemaStore::default();
        store.insert(VECOREL_SCHEMA, Document::Structured(core));

        let mut dataset = sample_dataset();
        let item = Arc::new(Field::new(
            "item",
            ArrowType::Struct(vec![Field::new("k", ArrowType::Utf8, true)].into()),
            true,
        ));
        let objects = StructArray::new(
            vec![Field::new("k", ArrowType::Utf8, true)].into(),
            vec![Arc::new(StringArray::from(vec!["a", "a", "b"])) as ArrayRef],
            None,
        );
        let tags = ListArray::new(
            item.clone(),
            arrow::buffer::OffsetBuffer::from_lengths([2, 1, 0]),
            Arc::new(objects),
            None,
        );
        dataset.batch = with_column(
            &dataset.batch,
            Field::new("tags", ArrowType::List(item), true),
            Arc::new(tags) as ArrayRef,
        )
        .unwrap();

        let report = run(&dataset, &store);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.with_level(Level::Info).count(), 1);
    }

    #[test]
    fn test_rows_use_their_collection_schema() {
        let mut schemas = Schemas::with_core("a");
        schemas.add("a", crate::utils::test::ADMIN_SCHEMA);
        schemas.merge(&Schemas::with_core("b"));
        let mut dataset = sample_dataset();
        dataset.collection = Collection::with_schemas(&schemas);
        let batch = with_column(
            &dataset.batch,
            Field::new("collection", ArrowType::Utf8, false),
            Arc::new(StringArray::from(vec!["a", "a", "b"])) as ArrayRef,
        )
        .unwrap();
        dataset.batch = with_column(
            &batch,
            Field::new("admin:country_code", ArrowType::Utf8, true),
            Arc::new(StringArray::from(vec![Some("DE"), Some("AT"), None])) as ArrayRef,
        )
        .unwrap();
        let report = run(&dataset, &test_store());
        assert!(report.is_valid(), "{:?}", report.issues);
    }
}
