use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "transcfg",
    version,
    about = "Inspect and tune translation configuration snapshots",
    long_about = "Loads translation configuration snapshots (JSON) into an in-memory store, \
                  newest timestamp wins, and reports or adjusts per-service settings."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "pretty", global = true)]
    pub output: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load snapshots in order and show the resulting selection
    Show {
        /// Snapshot files, offered to the store in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective max concurrent requests
    Get {
        /// Snapshot files, offered to the store in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Service name (defaults to the active service)
        #[arg(short, long, env = "TRANSCFG_SERVICE")]
        service: Option<String>,

        /// Profile name (defaults to the active profile)
        #[arg(short, long, env = "TRANSCFG_PROFILE")]
        profile: Option<String>,
    },

    /// Set max concurrent requests for a service profile
    Set {
        /// Snapshot file
        file: PathBuf,

        /// Service name
        #[arg(short, long)]
        service: String,

        /// Profile name
        #[arg(short, long, default_value = translation_config::DEFAULT_PROFILE)]
        profile: String,

        /// New limit (1-10)
        #[arg(long)]
        value: String,

        /// Write the updated snapshot back to the file
        #[arg(short, long)]
        write: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Pretty,
    /// Pretty-printed JSON
    Json,
}
