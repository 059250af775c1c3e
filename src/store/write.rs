//! Level Store mutation: permissive and strict writes, unlinking, splicing
//! and whole-level replacement.
//!
//! Every public mutator reports the affected top-level key to the observer.

use super::{LevelStore, Node, NodeData, NodeId, NodeKind};
use crate::error::AttributeError;
use crate::types::{display_path, Segment};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

impl LevelStore {
    /// Permissive write. Missing intermediate mappings are created and any
    /// intermediate value that cannot hold the next segment is replaced by a
    /// new mapping.
    ///
    /// An empty path replaces the whole level when `value` is a mapping and
    /// is ignored otherwise.
    pub fn write(&mut self, path: &[Segment], value: impl Into<Value>) {
        let value = value.into();
        let Some((last, parents)) = path.split_last() else {
            if let Err(err) = self.replace(value) {
                warn!(rank = %self.rank, error = %err, "Ignoring non-mapping write to level root");
            }
            return;
        };

        let mut current = self.root;
        for (index, segment) in parents.iter().enumerate() {
            let next = parents.get(index + 1).unwrap_or(last);
            match self.vivify(current, segment, next) {
                Some(child) => current = child,
                None => {
                    warn!(rank = %self.rank, path = %display_path(path), "Index out of range, write ignored");
                    return;
                }
            }
        }

        match self.attach(current, last, value) {
            Some(node) => self.notify_write(path, node),
            None => {
                warn!(rank = %self.rank, path = %display_path(path), "Index out of range, write ignored");
            }
        }
    }

    /// Strict write. Same vivification as [`LevelStore::write`], but an
    /// existing value that cannot hold the next segment raises
    /// `AttributeTypeMismatch` and leaves the level untouched.
    pub fn write_strict(
        &mut self,
        path: &[Segment],
        value: impl Into<Value>,
    ) -> Result<(), AttributeError> {
        let value = value.into();
        if path.is_empty() {
            return self.replace(value);
        }
        self.check_writable(path)?;
        self.write(path, value);
        Ok(())
    }

    /// Remove the node at `path`, returning its former value. Absent paths
    /// are not an error.
    pub fn unlink(&mut self, path: &[Segment]) -> Option<Value> {
        let Some((last, parents)) = path.split_last() else {
            let old = self.to_json();
            self.clear();
            return Some(old);
        };
        let parent = self.walk(parents)?;
        let child = self.lookup(parent, last)?;
        let canonical = self.find_path_to_entry(child).unwrap_or_else(|| display_path(path));
        let removed = self.to_json_at(child);

        match &mut self.nodes.get_mut(parent.0)?.data {
            NodeData::Map(map) => {
                map.remove(last.as_key().as_ref());
            }
            NodeData::Seq(items) => items.retain(|item| *item != child),
            NodeData::Scalar(_) => return None,
        }
        self.free(child);

        if let Some(observer) = self.observer.clone() {
            observer.invalidate(self.rank, Some(path[0].as_key().as_ref()));
            observer.unlinked(self.rank, &canonical);
        }
        Some(removed)
    }

    /// Strict unlink: `NoSuchAttribute` when nothing is stored at `path`.
    pub fn unlink_strict(&mut self, path: &[Segment]) -> Result<Value, AttributeError> {
        if !path.is_empty() && !self.exists(path) {
            return Err(AttributeError::no_such(path));
        }
        self.unlink(path).ok_or_else(|| AttributeError::no_such(path))
    }

    /// Ordered-list splice on the sequence at `path`: remove `len` elements
    /// from `start` and insert `values` in their place.
    ///
    /// Vivifies a sequence when the path is absent or holds another shape;
    /// pads with nulls when `start` lies past the end.
    pub fn splice(&mut self, path: &[Segment], start: usize, len: usize, values: Vec<Value>) {
        let Some((last, parents)) = path.split_last() else {
            warn!(rank = %self.rank, "Level root is a mapping, splice ignored");
            return;
        };

        let mut current = self.root;
        for (index, segment) in parents.iter().enumerate() {
            let next = parents.get(index + 1).unwrap_or(last);
            match self.vivify(current, segment, next) {
                Some(child) => current = child,
                None => return,
            }
        }
        let target = match self.lookup(current, last) {
            Some(id) if matches!(self.data(id), Some(NodeData::Seq(_))) => Some(id),
            _ => self.attach(current, last, Value::Array(Vec::new())),
        };
        let Some(target) = target else {
            return;
        };

        let current_len = match self.data(target) {
            Some(NodeData::Seq(items)) => items.len(),
            _ => 0,
        };
        let padding: Vec<NodeId> = (current_len..start)
            .map(|_| self.alloc(Some(target), Value::Null))
            .collect();
        let inserted: Vec<NodeId> = values
            .into_iter()
            .map(|value| self.alloc(Some(target), value))
            .collect();

        let removed = match self.nodes.get_mut(target.0).map(|node| &mut node.data) {
            Some(NodeData::Seq(items)) => {
                items.extend(padding);
                let end = start.saturating_add(len).min(items.len());
                items.splice(start..end, inserted).collect::<Vec<_>>()
            }
            _ => Vec::new(),
        };
        for id in removed {
            self.free(id);
        }
        self.notify_write(path, target);
    }

    /// Swap the whole level for `value`, which must be a mapping.
    pub fn replace(&mut self, value: Value) -> Result<(), AttributeError> {
        if !value.is_object() {
            return Err(AttributeError::AttributeTypeMismatch {
                path: "/".to_string(),
                expected: NodeKind::Map.name(),
                found: json_kind(&value).name(),
            });
        }
        self.nodes.clear();
        self.root = self.alloc(None, value);
        if let Some(observer) = self.observer.clone() {
            observer.invalidate(self.rank, None);
            observer.wrote(self, self.root);
        }
        Ok(())
    }

    /// Remove every key from the level.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.alloc(None, Value::Object(Map::new()));
        if let Some(observer) = self.observer.clone() {
            observer.invalidate(self.rank, None);
            observer.cleared(self.rank);
        }
    }

    /// Deep-merge a mapping into the level: mappings merge key by key, any
    /// other value replaces what is stored.
    pub fn merge_in(&mut self, value: Value) -> Result<(), AttributeError> {
        match value {
            Value::Object(map) => {
                let mut prefix = Vec::new();
                self.merge_map(&mut prefix, map);
                Ok(())
            }
            other => Err(AttributeError::AttributeTypeMismatch {
                path: "/".to_string(),
                expected: NodeKind::Map.name(),
                found: json_kind(&other).name(),
            }),
        }
    }

    fn merge_map(&mut self, prefix: &mut Vec<Segment>, incoming: Map<String, Value>) {
        for (key, value) in incoming {
            prefix.push(Segment::Key(key));
            let existing_is_map =
                matches!(self.read(prefix).map(|node| node.kind()), Some(NodeKind::Map));
            match value {
                Value::Object(nested) if existing_is_map => self.merge_map(prefix, nested),
                other => self.write(prefix, other),
            }
            prefix.pop();
        }
    }

    /// Verify that every existing node along `path` can hold the segment that
    /// follows it.
    fn check_writable(&self, path: &[Segment]) -> Result<(), AttributeError> {
        let mut current = self.root;
        for (index, segment) in path.iter().enumerate() {
            if !self.accepts(current, segment) {
                let found = self.data(current).map(NodeData::kind).unwrap_or(NodeKind::Scalar);
                return Err(AttributeError::AttributeTypeMismatch {
                    path: display_path(&path[..index]),
                    expected: match segment {
                        Segment::Key(_) => "mapping",
                        Segment::Index(_) => "mapping or sequence",
                    },
                    found: found.name(),
                });
            }
            if index + 1 == path.len() {
                break;
            }
            match self.lookup(current, segment) {
                Some(child) => current = child,
                None => return Ok(()),
            }
        }
        Ok(())
    }

    /// Whether `segment` can address a child of `id`.
    fn accepts(&self, id: NodeId, segment: &Segment) -> bool {
        match (self.data(id), segment) {
            (Some(NodeData::Map(_)), _) => true,
            (Some(NodeData::Seq(items)), Segment::Index(_)) => {
                segment.resolve_index(items.len()).is_some()
            }
            _ => false,
        }
    }

    /// Child of `parent` at `segment`, replaced by a fresh mapping unless it
    /// already accepts `next`.
    fn vivify(&mut self, parent: NodeId, segment: &Segment, next: &Segment) -> Option<NodeId> {
        match self.lookup(parent, segment) {
            Some(child) if self.accepts(child, next) => Some(child),
            _ => self.attach(parent, segment, Value::Object(Map::new())),
        }
    }

    /// Store `value` under `parent` at `segment`, freeing whatever was there.
    fn attach(&mut self, parent: NodeId, segment: &Segment, value: Value) -> Option<NodeId> {
        let parent_len = match self.data(parent)? {
            NodeData::Seq(items) => items.len(),
            NodeData::Map(_) => 0,
            NodeData::Scalar(_) => return None,
        };
        let is_seq = matches!(self.data(parent), Some(NodeData::Seq(_)));
        let index = if is_seq {
            Some(segment.resolve_index(parent_len)?)
        } else {
            None
        };

        let child = self.alloc(Some(parent), value);
        let padding: Vec<NodeId> = match index {
            Some(index) if index > parent_len => (parent_len..index)
                .map(|_| self.alloc(Some(parent), Value::Null))
                .collect(),
            _ => Vec::new(),
        };

        let replaced = match &mut self.nodes.get_mut(parent.0)?.data {
            NodeData::Map(map) => map.insert(segment.as_key().into_owned(), child),
            NodeData::Seq(items) => {
                items.extend(padding);
                let index = index.unwrap_or(items.len());
                if index < items.len() {
                    Some(std::mem::replace(&mut items[index], child))
                } else {
                    items.push(child);
                    None
                }
            }
            NodeData::Scalar(_) => None,
        };
        if let Some(old) = replaced {
            self.free(old);
        }
        Some(child)
    }

    /// Allocate `value` as a managed subtree under `parent`.
    fn alloc(&mut self, parent: Option<NodeId>, value: Value) -> NodeId {
        let id = NodeId(self.nodes.insert(Node {
            parent,
            data: NodeData::Scalar(crate::types::Scalar::Null),
        }));
        let data = match value {
            Value::Object(map) => NodeData::Map(
                map.into_iter()
                    .map(|(key, child)| (key, self.alloc(Some(id), child)))
                    .collect::<BTreeMap<_, _>>(),
            ),
            Value::Array(items) => NodeData::Seq(
                items
                    .into_iter()
                    .map(|child| self.alloc(Some(id), child))
                    .collect(),
            ),
            scalar => NodeData::Scalar(
                crate::types::Scalar::from_json(&scalar).unwrap_or(crate::types::Scalar::Null),
            ),
        };
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.data = data;
        }
        id
    }

    fn free(&mut self, id: NodeId) {
        for node in self.subtree(id) {
            self.nodes.try_remove(node.0);
        }
    }

    fn notify_write(&self, path: &[Segment], node: NodeId) {
        if let Some(observer) = self.observer.as_ref() {
            observer.invalidate(self.rank, path.first().map(|s| s.as_key()).as_deref());
            observer.wrote(self, node);
        }
    }
}

fn json_kind(value: &Value) -> NodeKind {
    match value {
        Value::Object(_) => NodeKind::Map,
        Value::Array(_) => NodeKind::Seq,
        _ => NodeKind::Scalar,
    }
}
