//! CLI domain: parse, route and presentation only.

mod parse;
mod presentation;
mod route;

pub use parse::{Cli, Commands, LayerSpec, OutputFormat, Sources};
pub use presentation::{format_debug_table, format_trace_table};
pub use route::RunContext;
