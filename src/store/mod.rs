//! Level Store
//!
//! One mutable attribute tree per precedence rank. Nodes live in an arena and
//! carry a non-owning parent id set when they are attached, so any node can
//! report its canonical path and every write can be routed to the owning
//! root for cache invalidation.

mod write;

use crate::error::AttributeError;
use crate::types::{display_path, Rank, Scalar, Segment};
use serde_json::Value;
use slab::Slab;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a node inside one [`LevelStore`]. Valid until the node's
/// subtree is unlinked or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Shape of a stored node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Scalar,
    Map,
    Seq,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Map => "mapping",
            NodeKind::Seq => "sequence",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Scalar(Scalar),
    Map(BTreeMap<String, NodeId>),
    Seq(Vec<NodeId>),
}

impl NodeData {
    fn kind(&self) -> NodeKind {
        match self {
            NodeData::Scalar(_) => NodeKind::Scalar,
            NodeData::Map(_) => NodeKind::Map,
            NodeData::Seq(_) => NodeKind::Seq,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    data: NodeData,
}

/// Receives change notifications from a level.
///
/// The resolver root installs one observer on each of its ten levels; it
/// drops cached merges and feeds the provenance tracer.
pub trait StoreObserver: Send + Sync {
    /// Something under `top_key` changed. `None` means the whole level did.
    fn invalidate(&self, rank: Rank, top_key: Option<&str>);

    /// `node` was attached to `store` by a write that has just completed.
    fn wrote(&self, _store: &LevelStore, _node: NodeId) {}

    /// The node at `path` was removed.
    fn unlinked(&self, _rank: Rank, _path: &str) {}

    /// Every key of the level was removed.
    fn cleared(&self, _rank: Rank) {}
}

/// Auto-vivifying mutable tree for a single precedence rank
pub struct LevelStore {
    rank: Rank,
    nodes: Slab<Node>,
    root: NodeId,
    observer: Option<Arc<dyn StoreObserver>>,
}

impl LevelStore {
    /// Create an empty level (the root is an empty mapping).
    pub fn new(rank: Rank) -> Self {
        let mut nodes = Slab::new();
        let root = NodeId(nodes.insert(Node {
            parent: None,
            data: NodeData::Map(BTreeMap::new()),
        }));
        Self {
            rank,
            nodes,
            root,
            observer: None,
        }
    }

    /// Create an empty level reporting its changes to `observer`.
    pub fn with_observer(rank: Rank, observer: Arc<dyn StoreObserver>) -> Self {
        let mut store = Self::new(rank);
        store.observer = Some(observer);
        store
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            store: self,
            id: self.root,
        }
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id.
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.contains(id.0).then_some(NodeRef { store: self, id })
    }

    pub(crate) fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|node| &node.data)
    }

    fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Number of top-level keys.
    pub fn len(&self) -> usize {
        match self.data(self.root) {
            Some(NodeData::Map(map)) => map.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child of `from` addressed by `segment`, if present.
    pub(crate) fn lookup(&self, from: NodeId, segment: &Segment) -> Option<NodeId> {
        match self.data(from)? {
            NodeData::Map(map) => map.get(segment.as_key().as_ref()).copied(),
            NodeData::Seq(items) => segment
                .resolve_index(items.len())
                .and_then(|index| items.get(index).copied()),
            NodeData::Scalar(_) => None,
        }
    }

    fn walk(&self, path: &[Segment]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root, |current, segment| self.lookup(current, segment))
    }

    /// Safe read: absent on a missing segment or when traversal hits a scalar.
    pub fn read(&self, path: &[Segment]) -> Option<NodeRef<'_>> {
        self.walk(path).map(|id| NodeRef { store: self, id })
    }

    /// Strict read: `NoSuchAttribute` instead of absent.
    pub fn read_strict(&self, path: &[Segment]) -> Result<NodeRef<'_>, AttributeError> {
        self.read(path).ok_or_else(|| AttributeError::no_such(path))
    }

    /// True when the key is present, even if it holds null.
    pub fn exists(&self, path: &[Segment]) -> bool {
        self.walk(path).is_some()
    }

    /// Read `len` elements of the sequence at `path` starting at `start`.
    ///
    /// Absent when the path does not hold a sequence or `start` lies past the
    /// end; empty when `start` is exactly the length.
    pub fn read_slice(&self, path: &[Segment], start: usize, len: usize) -> Option<Vec<Value>> {
        let id = self.walk(path)?;
        match self.data(id)? {
            NodeData::Seq(items) if start <= items.len() => {
                let end = start.saturating_add(len).min(items.len());
                Some(items[start..end].iter().map(|item| self.to_json_at(*item)).collect())
            }
            _ => None,
        }
    }

    /// Canonical `/a/b/0` path of a node, found by walking parent ids.
    pub fn find_path_to_entry(&self, id: NodeId) -> Option<String> {
        if !self.nodes.contains(id.0) {
            return None;
        }
        let mut segments = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            let segment = match self.data(parent)? {
                NodeData::Map(map) => map
                    .iter()
                    .find(|(_, child)| **child == current)
                    .map(|(key, _)| Segment::Key(key.clone()))?,
                NodeData::Seq(items) => items
                    .iter()
                    .position(|child| *child == current)
                    .map(|index| Segment::Index(index as i64))?,
                NodeData::Scalar(_) => return None,
            };
            segments.push(segment);
            current = parent;
        }
        segments.reverse();
        Some(display_path(&segments))
    }

    /// Whole level as plain JSON.
    pub fn to_json(&self) -> Value {
        self.to_json_at(self.root)
    }

    pub(crate) fn to_json_at(&self, id: NodeId) -> Value {
        match self.data(id) {
            Some(NodeData::Scalar(scalar)) => scalar.to_json(),
            Some(NodeData::Map(map)) => Value::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), self.to_json_at(*child)))
                    .collect(),
            ),
            Some(NodeData::Seq(items)) => {
                Value::Array(items.iter().map(|child| self.to_json_at(*child)).collect())
            }
            None => Value::Null,
        }
    }

    /// Ids of `id` and all its descendants, parents before children.
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            match self.data(current) {
                Some(NodeData::Map(map)) => stack.extend(map.values().rev().copied()),
                Some(NodeData::Seq(items)) => stack.extend(items.iter().rev().copied()),
                _ => {}
            }
        }
        out
    }

    /// `id` and its descendants paired with their canonical paths, parents
    /// before children. The start path is resolved once; descendants extend
    /// their parent's path.
    pub(crate) fn subtree_paths(&self, id: NodeId) -> Vec<(NodeId, String)> {
        let Some(start) = self.find_path_to_entry(id) else {
            return Vec::new();
        };
        fn child_path(parent: &str, segment: &dyn fmt::Display) -> String {
            if parent == "/" {
                format!("/{}", segment)
            } else {
                format!("{}/{}", parent, segment)
            }
        }

        let mut out = Vec::new();
        let mut stack = vec![(id, start)];
        while let Some((current, path)) = stack.pop() {
            match self.data(current) {
                Some(NodeData::Map(map)) => stack.extend(
                    map.iter()
                        .rev()
                        .map(|(key, child)| (*child, child_path(&path, key))),
                ),
                Some(NodeData::Seq(items)) => stack.extend(
                    items
                        .iter()
                        .enumerate()
                        .rev()
                        .map(|(index, child)| (*child, child_path(&path, &index))),
                ),
                _ => {}
            }
            out.push((current, path));
        }
        out
    }
}

impl fmt::Debug for LevelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelStore")
            .field("rank", &self.rank)
            .field("nodes", &self.nodes.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

/// Borrowed view of one stored node
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    store: &'a LevelStore,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Rank of the level holding this node.
    pub fn rank(&self) -> Rank {
        self.store.rank
    }

    pub fn kind(&self) -> NodeKind {
        self.store
            .data(self.id)
            .map(NodeData::kind)
            .unwrap_or(NodeKind::Scalar)
    }

    pub fn as_scalar(&self) -> Option<&'a Scalar> {
        match self.store.data(self.id)? {
            NodeData::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.as_scalar().map(Scalar::is_null).unwrap_or(false)
    }

    pub fn get(&self, segment: &Segment) -> Option<NodeRef<'a>> {
        self.store.lookup(self.id, segment).map(|id| NodeRef {
            store: self.store,
            id,
        })
    }

    pub fn get_path(&self, path: &[Segment]) -> Option<NodeRef<'a>> {
        path.iter().try_fold(*self, |node, segment| node.get(segment))
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.store.parent_of(self.id).map(|id| NodeRef {
            store: self.store,
            id,
        })
    }

    /// Mapping keys, sorted. Empty for other shapes.
    pub fn keys(&self) -> Vec<&'a str> {
        match self.store.data(self.id) {
            Some(NodeData::Map(map)) => map.keys().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// Entry count for containers, zero for scalars.
    pub fn len(&self) -> usize {
        match self.store.data(self.id) {
            Some(NodeData::Map(map)) => map.len(),
            Some(NodeData::Seq(items)) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Canonical path of this node within its level.
    pub fn path(&self) -> String {
        self.store
            .find_path_to_entry(self.id)
            .unwrap_or_else(|| "/".to_string())
    }

    pub fn to_json(&self) -> Value {
        self.store.to_json_at(self.id)
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("rank", &self.store.rank)
            .field("path", &self.path())
            .field("value", &self.to_json())
            .finish()
    }
}
