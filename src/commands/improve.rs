use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use super::{SchemaArgs, WriteArgs};
use crate::config::ReadOptions;
use crate::encoding::{geoparquet, read_dataset};
use crate::geometry::Crs;
use crate::ops::improve::parse_rename;
use crate::ops::{improve, ImproveOptions};
use crate::schema::SchemaStore;
use crate::utils::logging::{log_operation_complete, log_warning};

#[derive(Args, Debug, Clone)]
pub struct ImproveArgs {
    /// GeoParquet or GeoJSON file
    pub file: PathBuf,
    /// Output GeoParquet file; defaults to overwriting a GeoParquet input
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// Rename a property, as `old=new`; repeatable
    #[arg(long, short, value_name = "OLD=NEW", value_parser = parse_rename)]
    pub rename: Vec<(String, String)>,
    /// Add area and perimeter columns
    #[arg(long, short = 's')]
    pub add_sizes: bool,
    /// Repair invalid geometries
    #[arg(long, short = 'g')]
    pub fix_geometries: bool,
    /// Split multi-part geometries into one row per part
    #[arg(long, short = 'e')]
    pub explode_geometries: bool,
    /// Reproject to this CRS
    #[arg(long)]
    pub crs: Option<Crs>,
    #[command(flatten)]
    pub write: WriteArgs,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

impl ImproveArgs {
    fn output(&self) -> PathBuf {
        match &self.out {
            Some(out) => out.clone(),
            None if self.file.is_dir() => self.file.with_extension("parquet"),
            None => match self.file.extension().and_then(|e| e.to_str()) {
                Some(ext) if ext.eq_ignore_ascii_case("parquet") => self.file.clone(),
                _ => self.file.with_extension("parquet"),
            },
        }
    }
}

pub fn run(args: &ImproveArgs) -> Result<()> {
    let start = Instant::now();
    let schema_map = args.schemas.schema_map()?;
    let store = SchemaStore::new(schema_map.clone());
    let out = args.output();
    if out == args.file {
        log_warning("Overwriting the input file", Some(&out));
    }

    let dataset = read_dataset(&args.file, &ReadOptions::default().with_hydrate(true), &store)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let options = ImproveOptions {
        crs: args.crs.clone(),
        fix_geometries: args.fix_geometries,
        explode_geometries: args.explode_geometries,
        rename: args.rename.clone(),
        add_sizes: args.add_sizes,
    };
    let dataset = improve(dataset, &options)?;
    let rows = dataset.num_rows();

    geoparquet::write(dataset, &out, None, &args.write.options(schema_map), &store)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    log_operation_complete("improved", &out, rows, start.elapsed());
    println!("Wrote {rows} rows to {}", out.display());
    Ok(())
}
