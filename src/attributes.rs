//! Precedence Resolver Root
//!
//! [`NodeAttributes`] owns the ten level stores, the merge cache and the
//! provenance tracer. Reads go through the cache and hand out frozen values;
//! writes must name a rank, either through [`NodeAttributes::writer`] or one
//! of the per-rank accessors (`default_mut()`, `override_mut()`, ...).

use crate::config::AttributesConfig;
use crate::error::AttributeError;
use crate::frozen::{FrozenMap, FrozenValue};
use crate::merge::{self, CacheStats, Levels, MergeCache};
use crate::store::{LevelStore, NodeId, NodeRef, StoreObserver};
use crate::trace::{Origin, TraceAction, TraceEntry, TraceLog, TraceMode, Tracer};
use crate::types::{display_path, Family, Rank, RankMask, Segment};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Observer installed on every level: drops stale merges, feeds the tracer.
#[derive(Debug)]
struct RootHooks {
    cache: MergeCache,
    tracer: Tracer,
}

impl StoreObserver for RootHooks {
    fn invalidate(&self, _rank: Rank, top_key: Option<&str>) {
        match top_key {
            Some(key) => self.cache.invalidate(key),
            None => self.cache.invalidate_all(),
        }
    }

    fn wrote(&self, store: &LevelStore, node: NodeId) {
        self.tracer.record_write(store, node);
    }

    fn unlinked(&self, rank: Rank, path: &str) {
        self.tracer.record(rank, path, TraceAction::Unlink);
    }

    fn cleared(&self, rank: Rank) {
        self.tracer.record(rank, "/", TraceAction::Clear);
    }
}

/// Raw per-rank values at one path, for diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugValue {
    pub set_unless: bool,
    /// Every rank in ascending order; `None` means unset.
    pub levels: Vec<(Rank, Option<Value>)>,
}

impl fmt::Display for DebugValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "set_unless_enabled: {}", self.set_unless)?;
        for (rank, value) in &self.levels {
            match value {
                Some(value) => writeln!(f, "{}: {}", rank, value)?,
                None => writeln!(f, "{}: (unset)", rank)?,
            }
        }
        Ok(())
    }
}

/// Ten-rank attribute tree with a cached merged view
pub struct NodeAttributes {
    levels: Levels,
    hooks: Arc<RootHooks>,
    set_unless: bool,
}

impl fmt::Debug for NodeAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeAttributes")
            .field("trace_mode", self.hooks.tracer.mode())
            .field("set_unless", &self.set_unless)
            .field("cache", &self.hooks.cache.stats())
            .finish()
    }
}

macro_rules! rank_accessors {
    ($($name:ident => $rank:ident),+ $(,)?) => {
        $(
            #[doc = concat!("Writer for the `", stringify!($rank), "` rank.")]
            pub fn $name(&mut self) -> RankWriter<'_> {
                self.writer(Rank::$rank)
            }
        )+
    };
}

impl NodeAttributes {
    /// Empty tree; `trace` selects which writes are recorded.
    pub fn new(trace: TraceMode) -> Self {
        let hooks = Arc::new(RootHooks {
            cache: MergeCache::new(),
            tracer: Tracer::new(trace),
        });
        let observer: Arc<dyn StoreObserver> = hooks.clone();
        let levels: Levels =
            std::array::from_fn(|index| LevelStore::with_observer(Rank::ALL[index], observer.clone()));
        Self {
            levels,
            hooks,
            set_unless: false,
        }
    }

    pub fn from_config(config: &AttributesConfig) -> Self {
        info!(trace_mode = %config.trace_attributes, "Creating node attributes");
        Self::new(config.trace_attributes.clone())
    }

    // ---- rank-qualified access ----

    pub fn level(&self, rank: Rank) -> &LevelStore {
        &self.levels[rank.index()]
    }

    pub fn writer(&mut self, rank: Rank) -> RankWriter<'_> {
        RankWriter { attrs: self, rank }
    }

    rank_accessors! {
        default_mut => Default,
        env_default_mut => EnvDefault,
        role_default_mut => RoleDefault,
        force_default_mut => ForceDefault,
        normal_mut => Normal,
        override_mut => Override,
        role_override_mut => RoleOverride,
        env_override_mut => EnvOverride,
        force_override_mut => ForceOverride,
        automatic_mut => Automatic,
    }

    // ---- merged reads ----

    /// Merged value of one top-level key, served from the cache.
    pub fn get(&self, key: &str) -> Option<FrozenValue> {
        let levels = &self.levels;
        self.hooks.cache.get_or_compute(key, || {
            merge::resolve(levels, RankMask::ALL, &[Segment::Key(key.to_string())])
        })
    }

    /// Merged value at `path`; absent on any miss.
    pub fn read(&self, path: &[Segment]) -> Option<FrozenValue> {
        let Some((first, rest)) = path.split_first() else {
            return Some(FrozenValue::Map(self.merged()));
        };
        let top = self.get(first.as_key().as_ref())?;
        if rest.is_empty() {
            return Some(top);
        }
        top.get_path(rest).cloned()
    }

    /// Strict merged read: `NoSuchAttribute` on any miss.
    pub fn read_strict(&self, path: &[Segment]) -> Result<FrozenValue, AttributeError> {
        self.read(path).ok_or_else(|| AttributeError::no_such(path))
    }

    pub fn exists(&self, path: &[Segment]) -> bool {
        self.read(path).is_some()
    }

    /// Merged value of `key`, or `IndexError` when no rank defines it.
    pub fn fetch(&self, key: &str) -> Result<FrozenValue, AttributeError> {
        self.get(key).ok_or_else(|| AttributeError::IndexError {
            key: key.to_string(),
        })
    }

    pub fn fetch_or(&self, key: &str, default: impl Into<Value>) -> FrozenValue {
        self.get(key)
            .unwrap_or_else(|| FrozenValue::from_json(&default.into()))
    }

    pub fn fetch_or_else(&self, key: &str, fallback: impl FnOnce(&str) -> Value) -> FrozenValue {
        self.get(key)
            .unwrap_or_else(|| FrozenValue::from_json(&fallback(key)))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.levels
            .iter()
            .any(|level| level.exists(&[Segment::Key(key.to_string())]))
    }

    /// Top-level keys defined by any rank, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.levels
            .iter()
            .flat_map(|level| level.root().keys())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(LevelStore::is_empty)
    }

    /// Merged `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (String, FrozenValue)> + '_ {
        self.keys().into_iter().filter_map(|key| {
            let value = self.get(&key)?;
            Some((key, value))
        })
    }

    /// The whole merged tree.
    pub fn merged(&self) -> FrozenMap {
        FrozenMap::from_entries(self.iter().collect())
    }

    pub fn to_json(&self) -> Value {
        self.merged().to_mutable_copy()
    }

    /// Merged value restricted to the default family. Not cached.
    pub fn combined_default(&self, path: &[Segment]) -> Option<FrozenValue> {
        merge::resolve(&self.levels, RankMask::DEFAULTS, path)
    }

    /// Merged value restricted to the override family. Not cached.
    pub fn combined_override(&self, path: &[Segment]) -> Option<FrozenValue> {
        merge::resolve(&self.levels, RankMask::OVERRIDES, path)
    }

    /// Raw, unmerged value of every rank at `path`.
    pub fn debug_value(&self, path: &[Segment]) -> DebugValue {
        DebugValue {
            set_unless: self.set_unless,
            levels: self
                .levels
                .iter()
                .map(|level| (level.rank(), level.read(path).map(|node| node.to_json())))
                .collect(),
        }
    }

    /// Chained read proxy starting at top-level `key`.
    pub fn at(&self, segment: impl Into<Segment>) -> AttrPath<'_> {
        AttrPath {
            attrs: self,
            path: vec![segment.into()],
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.hooks.cache.stats()
    }

    // ---- writes ----

    /// Unscoped write. Always refused: writes must name a rank.
    pub fn insert(&self, _path: &[Segment], _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("insert"))
    }

    /// Enable or disable set-unless mode for all rank-qualified writes.
    pub fn set_unless_value_present(&mut self, enabled: bool) {
        self.set_unless = enabled;
    }

    pub fn is_set_unless(&self) -> bool {
        self.set_unless
    }

    /// Whether a set-unless write at `path` would be skipped.
    fn value_present(&self, path: &[Segment]) -> bool {
        self.read(path).is_some_and(|value| !value.is_null())
    }

    fn write_unless(&mut self, rank: Rank, path: &[Segment], value: Value) -> bool {
        let previous = std::mem::replace(&mut self.set_unless, true);
        let written = self.writer(rank).write(path, value);
        self.set_unless = previous;
        written
    }

    /// Write `default` unless some rank already provides a value.
    pub fn default_unless(&mut self, path: &[Segment], value: impl Into<Value>) -> bool {
        self.write_unless(Rank::Default, path, value.into())
    }

    pub fn normal_unless(&mut self, path: &[Segment], value: impl Into<Value>) -> bool {
        self.write_unless(Rank::Normal, path, value.into())
    }

    pub fn override_unless(&mut self, path: &[Segment], value: impl Into<Value>) -> bool {
        self.write_unless(Rank::Override, path, value.into())
    }

    fn remove_from(&mut self, ranks: &[Rank], path: &[Segment]) {
        for rank in ranks {
            self.levels[rank.index()].unlink(path);
        }
    }

    /// Remove `path` from every rank, returning the merged value it had.
    #[instrument(skip_all, fields(path = %display_path(path)))]
    pub fn rm(&mut self, path: &[Segment]) -> Option<Value> {
        let previous = self.read(path).map(|value| value.to_mutable_copy());
        self.remove_from(&Rank::ALL, path);
        debug!(removed = previous.is_some(), "Removed attribute from every rank");
        previous
    }

    /// Remove `path` from the default family, returning its combined value.
    pub fn rm_default(&mut self, path: &[Segment]) -> Option<Value> {
        let previous = self.combined_default(path).map(|value| value.to_mutable_copy());
        self.remove_from(Family::Default.ranks(), path);
        previous
    }

    pub fn rm_normal(&mut self, path: &[Segment]) -> Option<Value> {
        self.levels[Rank::Normal.index()].unlink(path)
    }

    /// Remove `path` from the override family, returning its combined value.
    pub fn rm_override(&mut self, path: &[Segment]) -> Option<Value> {
        let previous = self.combined_override(path).map(|value| value.to_mutable_copy());
        self.remove_from(Family::Override.ranks(), path);
        previous
    }

    /// Clear `path` from the whole default family, then write `force_default`.
    /// Unconditional: set-unless mode does not apply.
    pub fn force_default_write(&mut self, path: &[Segment], value: impl Into<Value>) {
        self.remove_from(Family::Default.ranks(), path);
        self.levels[Rank::ForceDefault.index()].write(path, value);
    }

    /// Clear `path` from the whole override family, then write `force_override`.
    /// Unconditional: set-unless mode does not apply.
    pub fn force_override_write(&mut self, path: &[Segment], value: impl Into<Value>) {
        self.remove_from(Family::Override.ranks(), path);
        self.levels[Rank::ForceOverride.index()].write(path, value);
    }

    // ---- provenance ----

    pub fn trace_mode(&self) -> &TraceMode {
        self.hooks.tracer.mode()
    }

    /// Attribute subsequent writes to `origin`; returns the previous origin.
    pub fn set_origin(&mut self, origin: Origin) -> Origin {
        self.hooks.tracer.set_origin(origin)
    }

    /// Run `f` with `origin` current, restoring the previous origin after.
    pub fn with_origin<R>(&mut self, origin: Origin, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.set_origin(origin);
        let result = f(self);
        self.set_origin(previous);
        result
    }

    pub fn trace_log(&self) -> TraceLog {
        self.hooks.tracer.log()
    }

    pub fn trace_entries(&self, path: &str) -> Vec<TraceEntry> {
        self.hooks.tracer.entries(path)
    }
}

/// Mutable handle on one rank
pub struct RankWriter<'a> {
    attrs: &'a mut NodeAttributes,
    rank: Rank,
}

impl<'a> RankWriter<'a> {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    fn store(&mut self) -> &mut LevelStore {
        &mut self.attrs.levels[self.rank.index()]
    }

    fn skipped(&self, path: &[Segment]) -> bool {
        if self.attrs.set_unless && self.attrs.value_present(path) {
            debug!(rank = %self.rank, path = %display_path(path), "Value present, write skipped");
            return true;
        }
        false
    }

    /// Permissive write. Returns false when set-unless mode skipped it.
    pub fn write(&mut self, path: &[Segment], value: impl Into<Value>) -> bool {
        if self.skipped(path) {
            return false;
        }
        self.store().write(path, value);
        true
    }

    /// Strict write; the tree is unchanged on error.
    pub fn write_strict(&mut self, path: &[Segment], value: impl Into<Value>) -> Result<bool, AttributeError> {
        if self.skipped(path) {
            return Ok(false);
        }
        self.store().write_strict(path, value)?;
        Ok(true)
    }

    pub fn unlink(&mut self, path: &[Segment]) -> Option<Value> {
        self.store().unlink(path)
    }

    pub fn unlink_strict(&mut self, path: &[Segment]) -> Result<Value, AttributeError> {
        self.store().unlink_strict(path)
    }

    pub fn splice(&mut self, path: &[Segment], start: usize, len: usize, values: Vec<Value>) {
        self.store().splice(path, start, len, values);
    }

    /// Replace the whole rank with `value`, which must be a mapping.
    pub fn replace(&mut self, value: impl Into<Value>) -> Result<(), AttributeError> {
        self.store().replace(value.into())
    }

    pub fn clear(&mut self) {
        self.store().clear();
    }

    pub fn merge_in(&mut self, value: impl Into<Value>) -> Result<(), AttributeError> {
        self.store().merge_in(value.into())
    }

    /// Raw value stored at this rank.
    pub fn read(&self, path: &[Segment]) -> Option<NodeRef<'_>> {
        self.attrs.levels[self.rank.index()].read(path)
    }

    pub fn read_slice(&self, path: &[Segment], start: usize, len: usize) -> Option<Vec<Value>> {
        self.attrs.levels[self.rank.index()].read_slice(path, start, len)
    }

    pub fn to_json(&self) -> Value {
        self.attrs.levels[self.rank.index()].to_json()
    }
}

/// Chained path proxy over the merged view: `attrs.at("a").at("b").get()`.
#[derive(Debug, Clone)]
pub struct AttrPath<'a> {
    attrs: &'a NodeAttributes,
    path: Vec<Segment>,
}

impl<'a> AttrPath<'a> {
    pub fn at(mut self, segment: impl Into<Segment>) -> Self {
        self.path.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.path
    }

    pub fn get(&self) -> Option<FrozenValue> {
        self.attrs.read(&self.path)
    }

    pub fn get_strict(&self) -> Result<FrozenValue, AttributeError> {
        self.attrs.read_strict(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.attrs.exists(&self.path)
    }

    pub fn debug_value(&self) -> DebugValue {
        self.attrs.debug_value(&self.path)
    }
}

impl fmt::Display for AttrPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_path(&self.path))
    }
}
