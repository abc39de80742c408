use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::SchemaMap;
use crate::error::util::safe_create_file;
use crate::jsonschema::Generator;
use crate::schema::{SchemaStore, VECOREL_SCHEMA};

#[derive(Args, Debug, Clone)]
pub struct JsonSchemaArgs {
    /// Vecorel schema to convert, as URI or local path
    #[arg(long, default_value = VECOREL_SCHEMA)]
    pub schema: String,
    /// Document whose `$defs` replace the built-in JSON Schema of each data type
    #[arg(long)]
    pub datatypes: Option<String>,
    /// Write to this file instead of stdout
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// `$id` of the generated schema
    #[arg(long)]
    pub id: Option<String>,
    /// Use a local file for a URI, as `<uri>,<path>`; repeatable
    #[arg(long = "map", value_name = "URI,PATH")]
    pub map: Vec<String>,
}

pub fn run(args: &JsonSchemaArgs) -> Result<()> {
    let store = SchemaStore::new(SchemaMap::from_pairs(&args.map)?);
    let schema = store
        .load_schema(&args.schema)
        .with_context(|| format!("Failed to load schema {}", args.schema))?;

    let mut generator = Generator::new();
    if let Some(uri) = &args.datatypes {
        let datatypes = store
            .load_value(uri)
            .with_context(|| format!("Failed to load data types {uri}"))?;
        generator = generator.with_datatypes(&datatypes);
    }
    if let Some(id) = &args.id {
        generator = generator.with_id(id);
    }

    let document = serde_json::to_string_pretty(&generator.feature(&schema))?;
    match &args.out {
        Some(path) => {
            let mut file = safe_create_file(path, "JSON Schema output")?;
            writeln!(file, "{document}")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote JSON Schema to {}", path.display());
        }
        None => println!("{document}"),
    }
    Ok(())
}
