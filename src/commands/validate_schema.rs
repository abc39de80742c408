use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

use crate::jsonschema::{Evaluator, METASCHEMA};
use crate::schema::{SchemaStore, VecorelSchema};

#[derive(Args, Debug, Clone)]
pub struct ValidateSchemaArgs {
    /// Schema documents (YAML or JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Metaschema to validate against instead of the bundled one
    #[arg(long)]
    pub metaschema: Option<String>,
}

pub fn run(args: &ValidateSchemaArgs) -> Result<()> {
    let store = SchemaStore::default();
    let metaschema: Value = match &args.metaschema {
        Some(uri) => store
            .load_value(uri)
            .with_context(|| format!("Failed to load metaschema {uri}"))?,
        None => serde_json::from_str(METASCHEMA).context("Bundled metaschema is invalid")?,
    };
    let evaluator = Evaluator::new(metaschema)?;

    let mut invalid = 0;
    for file in &args.files {
        let errors = check_schema(file, &store, &evaluator);
        if errors.is_empty() {
            println!("{}: VALID", file.display());
        } else {
            invalid += 1;
            println!("{}: INVALID", file.display());
            for error in &errors {
                println!("  - {error}");
            }
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} schemas are invalid", args.files.len());
    }
    Ok(())
}

/// Metaschema violations plus anything that keeps the document from loading
pub fn check_schema(path: &Path, store: &SchemaStore, evaluator: &Evaluator) -> Vec<String> {
    let value = match store.load_value(&path.to_string_lossy()) {
        Ok(value) => value,
        Err(e) => return vec![e.to_string()],
    };
    let mut errors: Vec<String> = evaluator
        .validate(&value)
        .iter()
        .map(ToString::to_string)
        .collect();
    if errors.is_empty() {
        if let Err(e) = VecorelSchema::from_value(value) {
            errors.push(e.to_string());
        }
    }
    errors
}
