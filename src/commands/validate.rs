use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use super::SchemaArgs;
use crate::utils::logging::{create_main_progress_bar, finish_and_clear};
use crate::validator::report::{Level, Report};
use crate::validator::{validate, ValidatorConfig};

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Files to validate; a directory is read as per-feature GeoJSON
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    /// Also check the values of every row
    #[arg(long)]
    pub data: bool,
    /// Only check the first N rows
    #[arg(long, short)]
    pub num: Option<usize>,
    /// Schema URI or pattern every file must declare; repeatable
    #[arg(long = "require", value_name = "URI")]
    pub required_schemas: Vec<String>,
    /// Accept collections declaring different core versions
    #[arg(long)]
    pub allow_mixed_versions: bool,
    /// Print informational notes as well
    #[arg(long, short)]
    pub info: bool,
    #[command(flatten)]
    pub schemas: SchemaArgs,
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let store = args.schemas.store()?;
    let config = ValidatorConfig {
        data: args.data,
        num: args.num,
        required_schemas: args.required_schemas.clone(),
        allow_mixed_versions: args.allow_mixed_versions,
    };

    let pb = create_main_progress_bar(args.files.len() as u64, Some("Validating"));
    let mut invalid = 0;
    for file in &args.files {
        pb.set_message(file.display().to_string());
        let report = validate(file, &config, &store);
        if !report.is_valid() {
            invalid += 1;
        }
        pb.suspend(|| print_report(&report, args.info));
        pb.inc(1);
    }
    finish_and_clear(&pb);

    if invalid > 0 {
        bail!("{invalid} of {} files are invalid", args.files.len());
    }
    Ok(())
}

fn print_report(report: &Report, with_info: bool) {
    let verdict = if report.is_valid() { "VALID" } else { "INVALID" };
    println!("{}: {verdict}", report.path.display());
    for issue in &report.issues {
        if issue.level == Level::Info && !with_info {
            continue;
        }
        println!("  - {issue}");
    }
}
