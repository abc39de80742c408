//! Subcommands of the `vecorel` binary.
//!
//! Every command has an `Args` struct parsed by clap and a `run` function.
//! Commands report failures through `anyhow`; the binary turns any error,
//! including a file that fails validation, into a non-zero exit code.

pub mod convert;
pub mod converters;
pub mod create_geojson;
pub mod create_geoparquet;
pub mod describe;
pub mod improve;
pub mod jsonschema;
pub mod merge;
pub mod rename_extension;
pub mod validate;
pub mod validate_schema;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::{Compression, GeoParquetVersion, SchemaMap, WriteOptions};
use crate::schema::SchemaStore;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the format, schemas, metadata and a sample of a file
    Describe(describe::DescribeArgs),
    /// Validate GeoParquet and GeoJSON files
    Validate(validate::ValidateArgs),
    /// Validate schema documents against the metaschema
    ValidateSchema(validate_schema::ValidateSchemaArgs),
    /// Convert GeoJSON feature files to GeoParquet
    CreateGeoparquet(create_geoparquet::CreateGeoParquetArgs),
    /// Convert a file to GeoJSON
    CreateGeojson(create_geojson::CreateGeoJsonArgs),
    /// Convert a third-party dataset with a named converter
    Convert(convert::ConvertArgs),
    /// List the available converters
    Converters(converters::ConvertersArgs),
    /// Merge several files into one GeoParquet file
    Merge(merge::MergeArgs),
    /// Reproject, repair, explode, rename or measure a dataset
    Improve(improve::ImproveArgs),
    /// Fill in the placeholders of an extension template
    RenameExtension(rename_extension::RenameExtensionArgs),
    /// Emit the JSON Schema for GeoJSON features of a schema
    Jsonschema(jsonschema::JsonSchemaArgs),
}

impl Command {
    pub fn run(&self) -> Result<()> {
        match self {
            Self::Describe(args) => describe::run(args),
            Self::Validate(args) => validate::run(args),
            Self::ValidateSchema(args) => validate_schema::run(args),
            Self::CreateGeoparquet(args) => create_geoparquet::run(args),
            Self::CreateGeojson(args) => create_geojson::run(args),
            Self::Convert(args) => convert::run(args),
            Self::Converters(args) => converters::run(args),
            Self::Merge(args) => merge::run(args),
            Self::Improve(args) => improve::run(args),
            Self::RenameExtension(args) => rename_extension::run(args),
            Self::Jsonschema(args) => jsonschema::run(args),
        }
    }
}

/// Local copies of schema documents
#[derive(Args, Debug, Clone, Default)]
pub struct SchemaArgs {
    /// Use a local file for a schema URI, as `<uri>,<path>`; repeatable
    #[arg(long = "schema", value_name = "URI,PATH")]
    pub schema: Vec<String>,
}

impl SchemaArgs {
    pub fn schema_map(&self) -> Result<SchemaMap> {
        Ok(SchemaMap::from_pairs(&self.schema)?)
    }

    pub fn store(&self) -> Result<SchemaStore> {
        Ok(SchemaStore::new(self.schema_map()?))
    }
}

/// GeoParquet output settings
#[derive(Args, Debug, Clone, Default)]
pub struct WriteArgs {
    /// Column compression: brotli, gzip, lz4, snappy, zstd or none
    #[arg(long, short = 'c', default_value_t = Compression::default())]
    pub compression: Compression,
    /// GeoParquet version: 1.0.0 or 1.1.0
    #[arg(long, default_value_t = GeoParquetVersion::default())]
    pub geoparquet_version: GeoParquetVersion,
}

impl WriteArgs {
    #[must_use]
    pub fn options(&self, schema_map: SchemaMap) -> WriteOptions {
        WriteOptions {
            compression: self.compression,
            geoparquet_version: self.geoparquet_version,
            schema_map,
            ..WriteOptions::default()
        }
    }
}
