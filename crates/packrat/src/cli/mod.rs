//! Command-line interface for packrat.
//!
//! This module provides the CLI structure for the `packrat` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{CheckCommand, ConfigCommand, PackCommand};

use crate::logging::Verbosity;

/// packrat - Archive paths listed in a YAML manifest
///
/// Each manifest entry maps a source file or directory to the .tar.gz
/// archive it should be packed into.
#[derive(Debug, Parser)]
#[command(name = "packrat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Archive every entry in a manifest
    Pack(PackCommand),

    /// Validate a manifest without archiving
    Check(CheckCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}
