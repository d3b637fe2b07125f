mod cli;
mod commands;
mod output;

use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};
use translation_config::ConfigStore;

use crate::{
    cli::{Args, Commands, OutputFormat},
    output::OutputManager,
};

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let format = args.output;
    if let Err(e) = run(args) {
        match format {
            OutputFormat::Json => {
                let error_json = serde_json::json!({
                    "status": "error",
                    "message": format!("{e:#}"),
                });
                println!("{error_json}");
            }
            OutputFormat::Pretty => {
                error!("Application error: {e:#}");
                eprintln!("Error: {e:#}");
            }
        }
        process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let store = ConfigStore::new();
    let output = OutputManager::new(args.output);

    let text = match args.command {
        Commands::Show { files } => output.summary(&commands::show(&store, &files)?)?,
        Commands::Get {
            files,
            service,
            profile,
        } => output.concurrency(&commands::get(
            &store,
            &files,
            service.as_deref(),
            profile.as_deref(),
        )?)?,
        Commands::Set {
            file,
            service,
            profile,
            value,
            write,
        } => output.profile(&commands::set(
            &store, &file, &service, &profile, &value, write,
        )?)?,
    };

    println!("{text}");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}
