//! node-attrs CLI Binary
//!
//! Merges per-rank attribute layers and prints merged values, per-rank debug
//! views, and the provenance log.

use clap::Parser;
use node_attrs::cli::{Cli, RunContext};
use node_attrs::config::ConfigLoader;
use node_attrs::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = match build_logging_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid logging options: {:#}", e);
            process::exit(2);
        }
    };
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    let context = match RunContext::new(cli.root.clone(), cli.config.clone(), cli.trace.as_deref()) {
        Ok(context) => context,
        Err(e) => {
            error!("Error loading configuration: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };
    info!(trace_attributes = %context.config().trace_attributes, "node-attrs starting");

    match context.execute(&cli.command) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

/// Logging configuration from the config file, then CLI flags on top.
fn build_logging_config(cli: &Cli) -> anyhow::Result<LoggingConfig> {
    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(&cli.root),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(level) = &cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.format = format.parse()?;
    }
    if let Some(output) = &cli.log_output {
        config.output = output.parse()?;
    }
    Ok(config)
}
