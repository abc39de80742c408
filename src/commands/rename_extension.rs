use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::ops::{rename_extension, ExtensionNames};

#[derive(Args, Debug, Clone)]
pub struct RenameExtensionArgs {
    /// Folder holding a copy of the extension template
    pub folder: PathBuf,
    /// Human-readable title, e.g. `Administrative Division`
    #[arg(long, short)]
    pub title: String,
    /// Repository slug, e.g. `administrative-division-extension`
    #[arg(long, short)]
    pub slug: String,
    /// GitHub organisation hosting the extension
    #[arg(long)]
    pub org: Option<String>,
    /// Property prefix without the colon; derived from the slug by default
    #[arg(long)]
    pub prefix: Option<String>,
}

pub fn run(args: &RenameExtensionArgs) -> Result<()> {
    let mut names = ExtensionNames::new(&args.title, &args.slug);
    if let Some(org) = &args.org {
        names.org.clone_from(org);
    }
    if let Some(prefix) = &args.prefix {
        names.prefix = prefix.trim_end_matches(':').to_string();
    }

    let changed = rename_extension(&args.folder, &names)
        .with_context(|| format!("Failed to rename the extension in {}", args.folder.display()))?;
    for path in &changed {
        println!("Updated {}", path.display());
    }
    println!("{} files updated", changed.len());
    Ok(())
}
