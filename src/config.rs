//! Configuration System
//!
//! Layered configuration for the attribute engine: built-in defaults, the
//! user file, then the working root's `config/` directory, then
//! `NODE_ATTRS__*` environment variables. The result is handed explicitly to
//! [`NodeAttributes::from_config`](crate::attributes::NodeAttributes::from_config).

use crate::error::AttributeError;
use crate::logging::LoggingConfig;
use crate::trace::TraceMode;
use config::{Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributesConfig {
    /// Which attribute writes to trace: `none`, `all`, or a path such as `/nginx`
    #[serde(default)]
    pub trace_attributes: TraceMode,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Builds an [`AttributesConfig`] from its sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load every layer, `root` being the directory holding `config/`.
    pub fn load(root: &Path) -> Result<AttributesConfig, AttributeError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, root)?;
        let config = builder
            .add_source(Environment::with_prefix("NODE_ATTRS").separator("__"))
            .build()?
            .try_deserialize::<AttributesConfig>()?;
        debug!(trace_attributes = %config.trace_attributes, "Configuration loaded");
        Ok(config)
    }

    /// Load defaults plus a single file.
    pub fn load_from_file(path: &Path) -> Result<AttributesConfig, AttributeError> {
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize::<AttributesConfig>()?;
        Ok(config)
    }

    /// `$HOME/.config/node-attrs/config.toml`, when `HOME` is set.
    pub fn global_config_path() -> Option<PathBuf> {
        sources::global_file::global_config_path()
    }
}
