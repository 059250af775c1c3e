//! Provenance Tracer
//!
//! Records who wrote which attribute path. Disabled by default; when enabled
//! each recorded write appends a [`TraceEntry`] under the canonical path of
//! every node it touched, in write order.

use crate::store::{LevelStore, NodeId};
use crate::types::Rank;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Which writes get recorded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TraceMode {
    #[default]
    None,
    All,
    /// Only writes at this canonical path or beneath it.
    Path(String),
}

impl TraceMode {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, TraceMode::None)
    }

    /// Whether a write at `path` should be recorded.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            TraceMode::None => false,
            TraceMode::All => true,
            TraceMode::Path(prefix) => {
                path == prefix
                    || (path.starts_with(prefix.as_str())
                        && path[prefix.len()..].starts_with('/'))
            }
        }
    }
}

impl FromStr for TraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "none" => Ok(TraceMode::None),
            "all" => Ok(TraceMode::All),
            path if path.starts_with('/') => {
                let trimmed = path.trim_end_matches('/');
                Ok(TraceMode::Path(if trimmed.is_empty() {
                    "/".to_string()
                } else {
                    trimmed.to_string()
                }))
            }
            other => Err(format!(
                "invalid trace mode '{}': expected none, all, or a path starting with '/'",
                other
            )),
        }
    }
}

impl TryFrom<String> for TraceMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TraceMode> for String {
    fn from(mode: TraceMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceMode::None => write!(f, "none"),
            TraceMode::All => write!(f, "all"),
            TraceMode::Path(path) => write!(f, "{}", path),
        }
    }
}

/// How a value reached the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mechanism {
    ExternalFacts,
    CommandLinePayload,
    StoredNodeRecord,
    Role,
    Environment,
    CookbookAttributeFile,
    RecipeCompileTime,
    RecipeConvergeTime,
    AttributeFileReload,
    InternalMerge,
    #[default]
    Unknown,
}

impl Mechanism {
    pub fn as_str(self) -> &'static str {
        match self {
            Mechanism::ExternalFacts => "external_facts",
            Mechanism::CommandLinePayload => "command_line_payload",
            Mechanism::StoredNodeRecord => "stored_node_record",
            Mechanism::Role => "role",
            Mechanism::Environment => "environment",
            Mechanism::CookbookAttributeFile => "cookbook_attribute_file",
            Mechanism::RecipeCompileTime => "recipe_compile_time",
            Mechanism::RecipeConvergeTime => "recipe_converge_time",
            Mechanism::AttributeFileReload => "attribute_file_reload",
            Mechanism::InternalMerge => "internal_merge",
            Mechanism::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mechanism-specific source details; only the fields relevant to the
/// mechanism are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookbook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookbook_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_path: Option<String>,
}

/// The mechanism and source attributed to writes made while it is current
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub mechanism: Mechanism,
    #[serde(default)]
    pub source: SourceLocation,
}

impl Origin {
    pub fn new(mechanism: Mechanism) -> Self {
        Self {
            mechanism,
            source: SourceLocation::default(),
        }
    }

    pub fn external_facts() -> Self {
        Self::new(Mechanism::ExternalFacts)
    }

    pub fn command_line(payload_path: Option<&str>) -> Self {
        let mut origin = Self::new(Mechanism::CommandLinePayload);
        origin.source.payload_path = payload_path.map(str::to_string);
        origin
    }

    pub fn stored_record(server_url: Option<&str>, node_name: &str) -> Self {
        let mut origin = Self::new(Mechanism::StoredNodeRecord);
        origin.source.server_url = server_url.map(str::to_string);
        origin.source.node_name = Some(node_name.to_string());
        origin
    }

    pub fn role(name: &str) -> Self {
        let mut origin = Self::new(Mechanism::Role);
        origin.source.role = Some(name.to_string());
        origin
    }

    pub fn environment(name: &str) -> Self {
        let mut origin = Self::new(Mechanism::Environment);
        origin.source.environment = Some(name.to_string());
        origin
    }

    pub fn cookbook_file(cookbook: &str, version: Option<&str>, file: &str) -> Self {
        let mut origin = Self::new(Mechanism::CookbookAttributeFile);
        origin.source.cookbook = Some(cookbook.to_string());
        origin.source.cookbook_version = version.map(str::to_string);
        origin.source.file = Some(file.to_string());
        origin
    }

    /// Same source, different mechanism (reloads, converge-time writes).
    pub fn with_mechanism(mut self, mechanism: Mechanism) -> Self {
        self.mechanism = mechanism;
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.source.line = Some(line);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceAction {
    Set,
    Unlink,
    Clear,
}

/// One recorded write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rank: Rank,
    pub action: TraceAction,
    pub mechanism: Mechanism,
    pub source: SourceLocation,
    pub recorded_at: DateTime<Utc>,
}

/// Entries per canonical path, oldest first
pub type TraceLog = BTreeMap<String, Vec<TraceEntry>>;

/// Write recorder owned by the resolver root
#[derive(Debug)]
pub struct Tracer {
    mode: TraceMode,
    origin: Mutex<Origin>,
    log: Mutex<TraceLog>,
}

impl Tracer {
    pub fn new(mode: TraceMode) -> Self {
        Self {
            mode,
            origin: Mutex::new(Origin::default()),
            log: Mutex::new(TraceLog::new()),
        }
    }

    pub fn mode(&self) -> &TraceMode {
        &self.mode
    }

    /// Make `origin` current, returning the previous one.
    pub fn set_origin(&self, origin: Origin) -> Origin {
        std::mem::replace(&mut *self.origin.lock(), origin)
    }

    pub fn origin(&self) -> Origin {
        self.origin.lock().clone()
    }

    /// Record `node` and everything beneath it as set at `store`'s rank.
    pub fn record_write(&self, store: &LevelStore, node: NodeId) {
        if !self.mode.is_enabled() {
            return;
        }
        for (_, path) in store.subtree_paths(node) {
            if path != "/" {
                self.record(store.rank(), &path, TraceAction::Set);
            }
        }
    }

    /// Append one entry for `path` if the mode selects it.
    pub fn record(&self, rank: Rank, path: &str, action: TraceAction) {
        if !self.mode.matches(path) {
            return;
        }
        let origin = self.origin.lock().clone();
        debug!(
            target: "node_attrs::trace",
            path,
            rank = %rank,
            action = ?action,
            mechanism = %origin.mechanism,
            file = origin.source.file.as_deref(),
            line = origin.source.line,
            "Attribute write traced"
        );
        self.log
            .lock()
            .entry(path.to_string())
            .or_default()
            .push(TraceEntry {
                rank,
                action,
                mechanism: origin.mechanism,
                source: origin.source,
                recorded_at: Utc::now(),
            });
    }

    pub fn log(&self) -> TraceLog {
        self.log.lock().clone()
    }

    pub fn entries(&self, path: &str) -> Vec<TraceEntry> {
        self.log.lock().get(path).cloned().unwrap_or_default()
    }
}
