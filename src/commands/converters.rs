use anyhow::Result;
use clap::Args;

use crate::converters::{registry, Converter};

#[derive(Args, Debug, Clone, Default)]
pub struct ConvertersArgs {
    /// List the data providers
    #[arg(long, short)]
    pub providers: bool,
    /// List the sources and variants
    #[arg(long, short)]
    pub sources: bool,
    /// Show descriptions, licenses and attributions
    #[arg(long, short)]
    pub verbose: bool,
}

pub fn run(args: &ConvertersArgs) -> Result<()> {
    for converter in registry() {
        print_converter(converter.as_ref(), args);
    }
    Ok(())
}

fn print_converter(converter: &dyn Converter, args: &ConvertersArgs) {
    let config = converter.config();
    println!("{}: {} ({})", config.id, config.title, config.short_name);

    if args.verbose {
        println!("  {}", config.description);
        if let Some(license) = &config.license {
            println!("  License: {license}");
        }
        if let Some(attribution) = &config.attribution {
            println!("  Attribution: {attribution}");
        }
    }
    if args.providers {
        for provider in &config.providers {
            match &provider.url {
                Some(url) => println!("  Provider: {} <{url}>", provider.name),
                None => println!("  Provider: {}", provider.name),
            }
        }
    }
    if args.sources {
        if config.sources.is_empty() {
            println!("  Sources: given with --input");
        }
        for source in &config.sources {
            println!("  Source: {source}");
        }
        for (variant, sources) in &config.variants {
            println!("  Variant {variant}: {}", sources.join(", "));
        }
    }
}
