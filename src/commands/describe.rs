use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::Field;
use clap::Args;
use serde_json::Value;

use super::SchemaArgs;
use crate::config::ReadOptions;
use crate::encoding::{geoparquet, read_dataset, Encoding};
use crate::frame::{batch_geometries, decode_dictionaries, with_column, Dataset, GEOMETRY_COLUMN};
use crate::geometry::GeometryType;
use crate::schema::{ResolveOptions, SchemaStore};
use crate::utils::logging::console::{print_heading, print_json, print_sample_rows, print_schema_info};
use crate::utils::logging::log_warning;

#[derive(Args, Debug, Clone)]
pub struct DescribeArgs {
    /// GeoParquet or GeoJSON file
    pub file: PathBuf,
    /// Number of rows to show
    #[arg(long, short, default_value_t = 10)]
    pub num: usize,
    /// Show the declared type of every column
    #[arg(long)]
    pub column_types: bool,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &DescribeArgs) -> Result<()> {
    let store = args.schemas.store()?;
    let encoding = Encoding::from_path(&args.file)?;

    print_heading("File");
    println!("  Path: {}", args.file.display());
    println!("  Encoding: {encoding}");
    if encoding == Encoding::GeoParquet {
        describe_parquet_file(args)?;
    }

    let options = ReadOptions::default().with_num(args.num);
    let dataset = read_dataset(&args.file, &options, &store)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    if encoding == Encoding::GeoJson {
        println!("  Features read: {}", dataset.num_rows());
    }
    println!("  CRS: {}", dataset.crs);

    describe_collection(&dataset)?;

    print_heading("Columns");
    if args.column_types {
        print_declared_types(&dataset, &store);
    } else {
        print_schema_info(&dataset.batch);
    }

    if args.num > 0 && dataset.num_rows() > 0 {
        print_heading(&format!("First {} rows", args.num.min(dataset.num_rows())));
        print_sample_rows(&readable_batch(&dataset)?, args.num)?;
    }
    Ok(())
}

fn describe_parquet_file(args: &DescribeArgs) -> Result<()> {
    let info = geoparquet::inspect(&args.file)?;
    println!("  Rows: {}", info.num_rows);
    println!("  Row groups: {}", info.num_row_groups);
    if let Some(compression) = &info.compression {
        println!("  Compression: {compression}");
    }
    if !info.has_collection {
        println!("  No 'collection' metadata");
    }

    match &info.geo {
        Some(geo) => {
            print_heading("GeoParquet");
            println!("  Version: {}", geo.version);
            println!("  Primary column: {}", geo.primary_column);
            for (name, column) in &geo.columns {
                let types = if column.geometry_types.is_empty() {
                    "any".to_string()
                } else {
                    column.geometry_types.join(", ")
                };
                println!("  - {name}: {} ({types})", column.encoding);
                if let Some(bbox) = &column.bbox {
                    println!("    bbox: {bbox:?}");
                }
                if column.covering.is_some() {
                    println!("    covering: bbox column");
                }
            }
        }
        None => println!("  No 'geo' metadata"),
    }
    Ok(())
}

fn describe_collection(dataset: &Dataset) -> Result<()> {
    let collection = &dataset.collection;
    print_heading("Schemas");
    match collection.get_schemas() {
        Ok(schemas) if !schemas.is_empty() => {
            for (id, uris) in schemas.iter() {
                println!("  {id}:");
                for uri in uris {
                    println!("    - {uri}");
                }
            }
        }
        Ok(_) => println!("  None"),
        Err(e) => println!("  Invalid: {e}"),
    }

    let custom = collection.get_custom_schemas()?;
    if !custom.is_empty() {
        print_heading("Custom schemas");
        print_json(&custom.to_value()?)?;
    }

    let metadata: serde_json::Map<String, Value> = collection
        .metadata()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    if !metadata.is_empty() {
        print_heading("Collection");
        print_json(&Value::Object(metadata))?;
    }
    Ok(())
}

/// Stored type next to the declared type of every column
fn print_declared_types(dataset: &Dataset, store: &SchemaStore) {
    let merged = match dataset.collection.resolve(store, ResolveOptions::default()) {
        Ok(resolved) => Some(resolved.merged()),
        Err(e) => {
            log_warning(&format!("Cannot resolve schemas: {e}"), None);
            None
        }
    };
    for field in dataset.batch.schema().fields() {
        let declared = merged
            .as_ref()
            .and_then(|schema| schema.property(field.name()))
            .and_then(|prop| prop.data_type)
            .map_or("undeclared", |t| t.as_str());
        let required = merged
            .as_ref()
            .is_some_and(|schema| schema.is_required(field.name()));
        println!(
            "  - {}: {declared} ({}{})",
            field.name(),
            field.data_type(),
            if required { ", required" } else { "" }
        );
    }
}

/// Geometries shown by type instead of WKB bytes
fn readable_batch(dataset: &Dataset) -> Result<arrow::record_batch::RecordBatch> {
    let batch = decode_dictionaries(&dataset.batch)?;
    if batch.column_by_name(GEOMETRY_COLUMN).is_none() {
        return Ok(batch);
    }
    let names: Vec<Option<&str>> = batch_geometries(&batch)?
        .iter()
        .map(|g| g.as_ref().map(|g| GeometryType::from_geometry(g).as_str()))
        .collect();
    let array: ArrayRef = Arc::new(StringArray::from(names));
    Ok(with_column(
        &batch,
        Field::new(GEOMETRY_COLUMN, arrow::datatypes::DataType::Utf8, true),
        array,
    )?)
}
