use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Args;

use super::{SchemaArgs, WriteArgs};
use crate::collection::Collection;
use crate::config::ReadOptions;
use crate::encoding::{geojson, geoparquet};
use crate::error::util::safe_read_to_string;
use crate::frame::{concat_union, Dataset};
use crate::schema::SchemaStore;
use crate::utils::logging::log_operation_complete;

#[derive(Args, Debug, Clone)]
pub struct CreateGeoParquetArgs {
    /// GeoJSON files or folders of per-feature files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Output GeoParquet file
    #[arg(long, short)]
    pub out: PathBuf,
    /// Collection JSON to use instead of the one embedded in the input
    #[arg(long)]
    pub collection: Option<PathBuf>,
    /// Only write these properties, in this order
    #[arg(long, short, value_delimiter = ',')]
    pub properties: Option<Vec<String>>,
    #[command(flatten)]
    pub write: WriteArgs,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &CreateGeoParquetArgs) -> Result<()> {
    let start = Instant::now();
    let schema_map = args.schemas.schema_map()?;
    let store = SchemaStore::new(schema_map.clone());

    let mut datasets = Vec::with_capacity(args.files.len());
    for file in &args.files {
        let dataset = geojson::read(file, &ReadOptions::default(), Some(&store))
            .with_context(|| format!("Failed to read {}", file.display()))?;
        datasets.push(dataset);
    }

    let collection = match &args.collection {
        Some(path) => Collection::from_json(&safe_read_to_string(path, "collection file")?)?,
        None => match datasets.iter().find(|d| !d.collection.is_empty()) {
            Some(dataset) => dataset.collection.clone(),
            None => bail!("No collection metadata found, pass one with --collection"),
        },
    };
    let batches: Vec<_> = datasets.iter().map(|d| d.batch.clone()).collect();
    let dataset = Dataset::new(collection, concat_union(&batches)?);
    let rows = dataset.num_rows();

    geoparquet::write(
        dataset,
        &args.out,
        args.properties.as_deref(),
        &args.write.options(schema_map),
        &store,
    )
    .with_context(|| format!("Failed to write {}", args.out.display()))?;
    log_operation_complete("wrote", &args.out, rows, start.elapsed());
    println!("Wrote {rows} features to {}", args.out.display());
    Ok(())
}
