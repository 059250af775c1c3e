//! node-attrs: Multi-Precedence Attribute Resolution
//!
//! Ten ordered precedence ranks each hold a mutable attribute tree. Reads see
//! a single merged, cached, read-only view; writes must name the rank they
//! target; an optional tracer records which mechanism wrote each path.

pub mod attributes;
pub mod cli;
pub mod config;
pub mod error;
pub mod frozen;
pub mod hydrate;
pub mod logging;
pub mod merge;
pub mod store;
pub mod trace;
pub mod types;
pub mod views;

pub use attributes::{AttrPath, DebugValue, NodeAttributes, RankWriter};
pub use config::{AttributesConfig, ConfigLoader};
pub use error::AttributeError;
pub use frozen::{FrozenMap, FrozenSeq, FrozenValue};
pub use merge::{CacheStats, MergeCell};
pub use store::{LevelStore, NodeId, NodeKind, NodeRef, StoreObserver};
pub use trace::{Mechanism, Origin, SourceLocation, TraceEntry, TraceLog, TraceMode};
pub use types::{Family, Rank, RankMask, Scalar, Segment};
pub use views::{CowMap, CowSeq};
