use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::{SchemaArgs, WriteArgs};
use crate::converters::{convert, get_converter, ConvertOptions};
use crate::schema::SchemaStore;

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    /// Converter id, see `vecorel converters`
    pub dataset: String,
    /// Output GeoParquet file
    #[arg(long, short)]
    pub out: PathBuf,
    /// Input file or URL replacing the converter's sources, as
    /// `PATH` or `PATH|MEMBER1,MEMBER2`; repeatable
    #[arg(long, short)]
    pub input: Vec<String>,
    /// Named variant of the sources
    #[arg(long)]
    pub variant: Option<String>,
    /// Folder for downloaded sources
    #[arg(long)]
    pub cache: Option<PathBuf>,
    /// Keep geometries as they are instead of repairing and exploding them
    #[arg(long)]
    pub original_geometries: bool,
    #[command(flatten)]
    pub write: WriteArgs,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    let converter = get_converter(&args.dataset)?;
    let schema_map = args.schemas.schema_map()?;
    let store = SchemaStore::new(schema_map.clone());
    let options = ConvertOptions {
        inputs: args.input.clone(),
        variant: args.variant.clone(),
        cache: args.cache.clone(),
        original_geometries: args.original_geometries,
        write: args.write.options(schema_map),
    };

    let rows = convert(converter.as_ref(), &args.out, &options, &store)
        .with_context(|| format!("Converter '{}' failed", converter.config().id))?;
    println!("Wrote {rows} rows to {}", args.out.display());
    Ok(())
}
