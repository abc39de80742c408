use std::process::ExitCode;

use clap::Parser;
use log::error;
use vecorel::commands::Command;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "vecorel")]
#[command(about = "Validate, convert and merge Vecorel GeoParquet and GeoJSON files", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug messages
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
