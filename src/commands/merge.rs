use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use super::{SchemaArgs, WriteArgs};
use crate::async_io::read_datasets_async;
use crate::config::ReadOptions;
use crate::encoding::geoparquet;
use crate::geometry::Crs;
use crate::ops::{merge, MergeOptions};
use crate::schema::SchemaStore;
use crate::utils::logging::log_operation_complete;

#[derive(Args, Debug, Clone)]
pub struct MergeArgs {
    /// Files to merge
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Output GeoParquet file
    #[arg(long, short)]
    pub out: PathBuf,
    /// CRS of the output, as `EPSG:<code>` or a PROJ string
    #[arg(long, default_value_t = Crs::WGS84)]
    pub crs: Crs,
    /// Additional property to keep; repeatable
    #[arg(long, short)]
    pub include: Vec<String>,
    /// Property to drop; repeatable
    #[arg(long, short)]
    pub exclude: Vec<String>,
    #[command(flatten)]
    pub write: WriteArgs,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &MergeArgs) -> Result<()> {
    let start = Instant::now();
    let schema_map = args.schemas.schema_map()?;
    let store = Arc::new(SchemaStore::new(schema_map.clone()));

    // Reads run on blocking tasks; schema resolution for the write happens
    // after the runtime is done.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start the async runtime")?;
    let datasets = runtime.block_on(read_datasets_async(
        &args.files,
        &ReadOptions::default().with_hydrate(true),
        Arc::clone(&store),
    ))?;
    drop(runtime);

    let options = MergeOptions {
        crs: args.crs.clone(),
        include: args.include.clone(),
        exclude: args.exclude.clone(),
    };
    let merged = merge(datasets, &options)?;
    let rows = merged.num_rows();

    geoparquet::write(merged, &args.out, None, &args.write.options(schema_map), &store)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    log_operation_complete("merged", &args.out, rows, start.elapsed());
    println!(
        "Merged {} files with {rows} rows into {}",
        args.files.len(),
        args.out.display()
    );
    Ok(())
}
