//! CLI route: run context and command dispatch.

use crate::attributes::NodeAttributes;
use crate::cli::parse::{Commands, OutputFormat, Sources};
use crate::cli::presentation::{format_debug_table, format_trace_table};
use crate::config::{AttributesConfig, ConfigLoader};
use crate::hydrate::{
    self, CommandLinePayload, CookbookAttributeFile, EnvironmentAttributes, RoleAttributes,
    StoredNodeRecord,
};
use crate::trace::{Mechanism, Origin, TraceMode};
use crate::types::parse_path;
use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded configuration only.
pub struct RunContext {
    config: AttributesConfig,
}

impl RunContext {
    /// Load configuration from `config_path` or the layered sources under `root`;
    /// `trace` overrides the configured trace mode.
    pub fn new(
        root: PathBuf,
        config_path: Option<PathBuf>,
        trace: Option<&str>,
    ) -> anyhow::Result<Self> {
        let mut config = match config_path {
            Some(path) => ConfigLoader::load_from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ConfigLoader::load(&root)?,
        };
        if let Some(mode) = trace {
            config.trace_attributes = mode.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(Self { config })
    }

    pub fn from_config(config: AttributesConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AttributesConfig {
        &self.config
    }

    /// Run one command, returning what should be printed.
    pub fn execute(&self, command: &Commands) -> anyhow::Result<String> {
        match command {
            Commands::Merge {
                sources,
                path,
                family,
            } => {
                let attrs = self.hydrate(sources, self.config.trace_attributes.clone())?;
                let segments = parse_path(path);
                let value = match family.as_deref() {
                    None => attrs.read(&segments),
                    Some("default") => attrs.combined_default(&segments),
                    Some("override") => attrs.combined_override(&segments),
                    Some(other) => bail!("unknown family '{}': expected default or override", other),
                };
                let value = value.with_context(|| format!("no attribute at {}", path))?;
                Ok(serde_json::to_string_pretty(&value)?)
            }
            Commands::Debug {
                sources,
                path,
                format,
            } => {
                let attrs = self.hydrate(sources, self.config.trace_attributes.clone())?;
                let debug = attrs.debug_value(&parse_path(path));
                match format {
                    OutputFormat::Json => Ok(serde_json::to_string_pretty(&debug)?),
                    OutputFormat::Text => Ok(format_debug_table(path, &debug)),
                }
            }
            Commands::Trace {
                sources,
                path,
                format,
            } => {
                let mode = match &self.config.trace_attributes {
                    TraceMode::None => TraceMode::All,
                    configured => configured.clone(),
                };
                let attrs = self.hydrate(sources, mode)?;
                let mut log = attrs.trace_log();
                if let Some(path) = path {
                    log.retain(|entry_path, _| entry_path == path);
                }
                match format {
                    OutputFormat::Json => Ok(serde_json::to_string_pretty(&log)?),
                    OutputFormat::Text => Ok(format_trace_table(&log)),
                }
            }
        }
    }

    /// Build a tree from `sources`, phase by phase.
    fn hydrate(&self, sources: &Sources, trace: TraceMode) -> anyhow::Result<NodeAttributes> {
        let mut attrs = NodeAttributes::new(trace);

        let facts = match &sources.facts {
            Some(path) => read_json::<Value>(path)?,
            None => Value::Object(Default::default()),
        };
        let payload = match &sources.payload {
            Some(path) => Some(CommandLinePayload {
                path: Some(path.display().to_string()),
                attributes: read_json(path)?,
            }),
            None => None,
        };
        let run_list = hydrate::consume_external_attrs(&mut attrs, facts, payload.as_ref())?;
        if let Some(run_list) = run_list {
            info!(entries = run_list.len(), "Run list supplied on the command line");
        }

        if let Some(path) = &sources.record {
            let record: StoredNodeRecord = read_json(path)?;
            hydrate::apply_stored_record(&mut attrs, &record)?;
        }

        for layer in &sources.layers {
            let value: Value = read_json(&layer.file)?;
            let mut origin = Origin::new(Mechanism::Unknown);
            origin.source.file = Some(layer.file.display().to_string());
            attrs
                .with_origin(origin, |attrs| attrs.writer(layer.rank).merge_in(value))
                .with_context(|| format!("layer {}", layer.file.display()))?;
            debug!(rank = %layer.rank, file = %layer.file.display(), "Layer applied");
        }

        for path in &sources.roles {
            let role: RoleAttributes = read_json(path)?;
            hydrate::apply_role(&mut attrs, &role)?;
        }
        if let Some(path) = &sources.environment {
            let environment: EnvironmentAttributes = read_json(path)?;
            hydrate::apply_environment(&mut attrs, &environment)?;
        }
        for path in &sources.attribute_files {
            let file: CookbookAttributeFile = read_json(path)?;
            hydrate::apply_cookbook_attributes(&mut attrs, &file)
                .with_context(|| format!("attribute file {}", path.display()))?;
        }

        Ok(attrs)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
