use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::SchemaArgs;
use crate::config::{GeoJsonOptions, ReadOptions};
use crate::encoding::{geojson, read_dataset};
use crate::geometry::Crs;
use crate::ops::reproject;

#[derive(Args, Debug, Clone)]
pub struct CreateGeoJsonArgs {
    /// GeoParquet (or GeoJSON) file to convert
    pub file: PathBuf,
    /// Output file, or folder with --features
    #[arg(long, short)]
    pub out: PathBuf,
    /// Write one file per feature
    #[arg(long, short)]
    pub features: bool,
    /// Only write the first N features
    #[arg(long, short)]
    pub num: Option<usize>,
    /// Pretty-print with this many spaces
    #[arg(long, short)]
    pub indent: Option<usize>,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &CreateGeoJsonArgs) -> Result<()> {
    let store = args.schemas.store()?;
    let read_options = ReadOptions {
        num: args.num,
        ..ReadOptions::default()
    };
    let dataset = read_dataset(&args.file, &read_options, &store)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    // GeoJSON coordinates are always WGS84
    let dataset = reproject(dataset, &Crs::WGS84)?;

    let options = GeoJsonOptions {
        features: args.features,
        num: args.num,
        indent: args.indent,
    };
    let written = geojson::write(&dataset, &args.out, &options)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    println!("Wrote {written} features to {}", args.out.display());
    Ok(())
}
