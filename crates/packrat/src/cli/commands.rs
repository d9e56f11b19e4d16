//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Pack command arguments.
#[derive(Debug, Args)]
pub struct PackCommand {
    /// Manifest mapping source paths to destination archives (.yml or .yaml)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,

    /// Overwrite destinations that already exist
    #[arg(short = 'O', long = "override")]
    pub override_existing: bool,

    /// Report what would be done without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Exit with an error status if any entry failed
    #[arg(long)]
    pub strict: bool,
}

/// Check command arguments.
#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Manifest to validate
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
