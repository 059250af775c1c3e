//! CLI parse: clap types for node-attrs. No behavior; definitions only.

use crate::types::Rank;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// node-attrs CLI - resolve layered node attributes
#[derive(Parser, Debug)]
#[command(name = "node-attrs")]
#[command(about = "Merge per-rank attribute layers and inspect where values came from")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config/ (layered configuration)
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Trace mode: none, all, or a path such as /nginx
    #[arg(long)]
    pub trace: Option<String>,

    /// Enable verbose logging
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,
}

/// One `RANK=FILE` layer argument
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub rank: Rank,
    pub file: PathBuf,
}

fn parse_layer(arg: &str) -> Result<LayerSpec, String> {
    let (rank, file) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected RANK=FILE, got '{}'", arg))?;
    Ok(LayerSpec {
        rank: rank.trim().parse()?,
        file: PathBuf::from(file.trim()),
    })
}

/// Attribute sources, applied in run phase order
#[derive(Args, Debug, Clone, Default)]
pub struct Sources {
    /// External facts JSON (automatic rank)
    #[arg(long)]
    pub facts: Option<PathBuf>,

    /// Command-line payload JSON (normal rank)
    #[arg(long)]
    pub payload: Option<PathBuf>,

    /// Stored node record JSON
    #[arg(long)]
    pub record: Option<PathBuf>,

    /// Role JSON; repeat to apply several roles in order
    #[arg(long = "role")]
    pub roles: Vec<PathBuf>,

    /// Environment JSON
    #[arg(long)]
    pub environment: Option<PathBuf>,

    /// Evaluated cookbook attribute file JSON; repeatable
    #[arg(long = "attribute-file")]
    pub attribute_files: Vec<PathBuf>,

    /// Raw layer written straight into a rank, e.g. override=over.json
    #[arg(long = "layer", value_parser = parse_layer)]
    pub layers: Vec<LayerSpec>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the merged value at PATH (whole tree by default)
    Merge {
        #[command(flatten)]
        sources: Sources,
        /// Canonical path, e.g. /nginx/ports
        #[arg(default_value = "/")]
        path: String,
        /// Restrict to one family: default or override
        #[arg(long)]
        family: Option<String>,
    },
    /// Show every rank's raw value at PATH
    Debug {
        #[command(flatten)]
        sources: Sources,
        path: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show the provenance log, optionally for one PATH
    Trace {
        #[command(flatten)]
        sources: Sources,
        path: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}
