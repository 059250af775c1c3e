//! CLI presentation: tables for debug and trace output.

use crate::attributes::DebugValue;
use crate::trace::{SourceLocation, TraceLog};
use comfy_table::Table;

pub fn format_debug_table(path: &str, debug: &DebugValue) -> String {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Rank", "Value"]);
    for (rank, value) in &debug.levels {
        let shown = value
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![rank.to_string(), shown]);
    }
    format!(
        "{} (set_unless: {})\n{}",
        path, debug.set_unless, table
    )
}

pub fn format_trace_table(log: &TraceLog) -> String {
    if log.is_empty() {
        return "No traced writes".to_string();
    }
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Path", "Rank", "Action", "Mechanism", "Source"]);
    for (path, entries) in log {
        for entry in entries {
            table.add_row(vec![
                path.clone(),
                entry.rank.to_string(),
                format!("{:?}", entry.action).to_lowercase(),
                entry.mechanism.to_string(),
                describe_source(&entry.source),
            ]);
        }
    }
    table.to_string()
}

fn describe_source(source: &SourceLocation) -> String {
    let mut parts = Vec::new();
    if let Some(cookbook) = &source.cookbook {
        match &source.cookbook_version {
            Some(version) => parts.push(format!("{}@{}", cookbook, version)),
            None => parts.push(cookbook.clone()),
        }
    }
    if let Some(file) = &source.file {
        match source.line {
            Some(line) => parts.push(format!("{}:{}", file, line)),
            None => parts.push(file.clone()),
        }
    }
    for (label, value) in [
        ("role", &source.role),
        ("environment", &source.environment),
        ("server", &source.server_url),
        ("node", &source.node_name),
        ("payload", &source.payload_path),
    ] {
        if let Some(value) = value {
            parts.push(format!("{}={}", label, value));
        }
    }
    if parts.is_empty() {
        "-".to_string()
    } else {
        parts.join(" ")
    }
}
