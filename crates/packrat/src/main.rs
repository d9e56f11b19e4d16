//! `packrat` - CLI for packing manifest entries into tar.gz archives.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;

use packrat::cli::{CheckCommand, Cli, Command, ConfigCommand, PackCommand};
use packrat::{init_logging, Config, Manifest, ManifestPath, Packer};

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = Config::load_from(cli.config)?;
    debug!("configuration: {config:?}");

    match cli.command {
        Command::Pack(pack_cmd) => handle_pack(config, &pack_cmd),
        Command::Check(check_cmd) => handle_check(&check_cmd).map(|()| ExitCode::SUCCESS),
        Command::Config(config_cmd) => {
            handle_config(&config, config_cmd).map(|()| ExitCode::SUCCESS)
        }
    }
}

fn handle_pack(
    config: Config,
    cmd: &PackCommand,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = config.with_flags(cmd.override_existing, cmd.json, cmd.strict);

    let path = ManifestPath::validate(&cmd.manifest)?;
    let manifest = Manifest::load(&path)?;

    let report = Packer::from_config(&config)?
        .dry_run(cmd.dry_run)
        .run(&manifest);

    if config.output.json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }

    if config.output.strict && report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn handle_check(cmd: &CheckCommand) -> Result<(), Box<dyn std::error::Error>> {
    let path = ManifestPath::validate(&cmd.manifest)?;
    let manifest = Manifest::load(&path)?;
    println!(
        "Manifest '{}' is valid: {} entries.",
        path.as_path().display(),
        manifest.len()
    );
    for entry in manifest.entries() {
        println!(
            "  {} -> {}",
            entry.source.display(),
            entry.destination.display()
        );
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Archive]");
                println!("  Override existing:  {}", config.archive.override_existing);
                println!("  Compression level:  {}", config.archive.compression_level);
                println!("  Follow symlinks:    {}", config.archive.follow_symlinks);
                println!(
                    "  Exclude patterns:   {}",
                    config.archive.exclude_patterns.len()
                );
                println!();
                println!("[Output]");
                println!("  JSON:               {}", config.output.json);
                println!("  Strict:             {}", config.output.strict);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
