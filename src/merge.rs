//! Precedence Resolver
//!
//! Resolves the value at a path from the ten level stores. A [`MergeCell`]
//! holds, per rank, a handle to that rank's node at the path; stepping into a
//! child resolves exactly one level, so merging stays lazy until a caller
//! materializes the cell into a [`FrozenValue`].
//!
//! Rules:
//! - mappings deep-merge key by key across every rank in the mask;
//! - for a given key, a scalar at the highest defining rank wins outright;
//! - sequences concatenate (ascending rank order) only within the
//!   highest-precedence family that holds one.

mod cache;

pub use cache::{CacheStats, MergeCache};

use crate::frozen::{FrozenMap, FrozenSeq, FrozenValue};
use crate::store::{LevelStore, NodeData, NodeId, NodeKind};
use crate::types::{Family, Rank, RankMask, Scalar, Segment};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// The ten level stores, indexed by [`Rank::index`].
pub type Levels = [LevelStore; Rank::COUNT];

/// Outcome of resolving one child of a cell
#[derive(Debug, Clone)]
pub enum Resolved {
    /// The highest defining rank holds a scalar; lower ranks are ignored.
    Scalar(Scalar),
    /// The highest defining rank holds a container; resolution continues on
    /// the next access.
    Cell(MergeCell),
}

/// Partially resolved value at one path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeCell {
    slots: [Option<NodeId>; Rank::COUNT],
}

impl MergeCell {
    /// Cell over the level roots of every rank in `mask`.
    pub fn root(levels: &Levels, mask: RankMask) -> Self {
        let mut cell = MergeCell::default();
        for rank in Rank::ALL {
            if mask.contains(rank) {
                cell.slots[rank.index()] = Some(levels[rank.index()].root_id());
            }
        }
        cell
    }

    fn single(rank: Rank, id: NodeId) -> Self {
        let mut cell = MergeCell::default();
        cell.slots[rank.index()] = Some(id);
        cell
    }

    /// Handle contributed by `rank`, if any.
    pub fn slot(&self, rank: Rank) -> Option<NodeId> {
        self.slots[rank.index()]
    }

    /// Ranks contributing to this cell, lowest first.
    pub fn contributing_ranks(&self) -> Vec<Rank> {
        Rank::ALL
            .into_iter()
            .filter(|rank| self.slot(*rank).is_some())
            .collect()
    }

    fn data<'a>(&self, levels: &'a Levels, rank: Rank) -> Option<&'a NodeData> {
        self.slot(rank)
            .and_then(|id| levels[rank.index()].data(id))
    }

    /// Shape of the highest-precedence non-null contribution. A cell whose
    /// contributions are all null is a null scalar.
    pub fn kind(&self, levels: &Levels) -> Option<NodeKind> {
        let mut saw_null = false;
        for rank in Rank::ALL.into_iter().rev() {
            match self.data(levels, rank) {
                Some(NodeData::Scalar(Scalar::Null)) => saw_null = true,
                Some(NodeData::Scalar(_)) => return Some(NodeKind::Scalar),
                Some(NodeData::Map(_)) => return Some(NodeKind::Map),
                Some(NodeData::Seq(_)) => return Some(NodeKind::Seq),
                None => {}
            }
        }
        saw_null.then_some(NodeKind::Scalar)
    }

    /// Resolve one child of this cell.
    pub fn child(&self, levels: &Levels, segment: &Segment) -> Option<Resolved> {
        match self.kind(levels)? {
            NodeKind::Map => self.map_child(levels, segment.as_key().as_ref()),
            NodeKind::Seq => {
                let items = self.sequence_items(levels);
                let (rank, id) = *segment
                    .resolve_index(items.len())
                    .and_then(|index| items.get(index))?;
                Some(Self::element(levels, rank, id))
            }
            NodeKind::Scalar => None,
        }
    }

    fn map_child(&self, levels: &Levels, key: &str) -> Option<Resolved> {
        let mut merged = MergeCell::default();
        let mut highest: Option<(Rank, NodeId)> = None;

        for rank in Rank::ALL.into_iter().rev() {
            let Some(NodeData::Map(map)) = self.data(levels, rank) else {
                continue;
            };
            let Some(child) = map.get(key).copied() else {
                continue;
            };
            if highest.is_none() {
                highest = Some((rank, child));
                if let Some(NodeData::Scalar(scalar)) = levels[rank.index()].data(child) {
                    trace!(key, rank = %rank, "Scalar at highest defining rank");
                    return Some(Resolved::Scalar(scalar.clone()));
                }
            }
            merged.slots[rank.index()] = Some(child);
        }

        highest.map(|_| Resolved::Cell(merged))
    }

    fn element(levels: &Levels, rank: Rank, id: NodeId) -> Resolved {
        match levels[rank.index()].data(id) {
            Some(NodeData::Scalar(scalar)) => Resolved::Scalar(scalar.clone()),
            _ => Resolved::Cell(MergeCell::single(rank, id)),
        }
    }

    /// Union of keys across every rank holding a mapping here.
    pub fn keys(&self, levels: &Levels) -> BTreeSet<String> {
        Rank::ALL
            .into_iter()
            .filter_map(|rank| match self.data(levels, rank) {
                Some(NodeData::Map(map)) => Some(map.keys().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Elements of the merged sequence, tagged with their contributing rank.
    ///
    /// The highest-precedence family holding a sequence wins; within it the
    /// member ranks' sequences are concatenated lowest rank first.
    pub fn sequence_items(&self, levels: &Levels) -> Vec<(Rank, NodeId)> {
        for family in Family::DESCENDING {
            let contributing: Vec<(Rank, &Vec<NodeId>)> = family
                .ranks()
                .iter()
                .filter_map(|rank| match self.data(levels, *rank) {
                    Some(NodeData::Seq(items)) => Some((*rank, items)),
                    _ => None,
                })
                .collect();
            if contributing.is_empty() {
                continue;
            }
            trace!(?family, ranks = contributing.len(), "Sequence family selected");
            return contributing
                .into_iter()
                .flat_map(|(rank, items)| items.iter().map(move |id| (rank, *id)))
                .collect();
        }
        Vec::new()
    }

    /// Fully resolve this cell and everything beneath it.
    pub fn materialize(&self, levels: &Levels) -> FrozenValue {
        match self.kind(levels) {
            Some(NodeKind::Map) => {
                let entries: BTreeMap<String, FrozenValue> = self
                    .keys(levels)
                    .into_iter()
                    .filter_map(|key| {
                        let value = match self.map_child(levels, &key)? {
                            Resolved::Scalar(scalar) => FrozenValue::Scalar(scalar),
                            Resolved::Cell(cell) => cell.materialize(levels),
                        };
                        Some((key, value))
                    })
                    .collect();
                FrozenValue::Map(FrozenMap::from_entries(entries))
            }
            Some(NodeKind::Seq) => FrozenValue::Seq(FrozenSeq::from_items(
                self.sequence_items(levels)
                    .into_iter()
                    .map(|(rank, id)| match Self::element(levels, rank, id) {
                        Resolved::Scalar(scalar) => FrozenValue::Scalar(scalar),
                        Resolved::Cell(cell) => cell.materialize(levels),
                    })
                    .collect(),
            )),
            Some(NodeKind::Scalar) => FrozenValue::Scalar(self.highest_scalar(levels)),
            None => FrozenValue::null(),
        }
    }

    fn highest_scalar(&self, levels: &Levels) -> Scalar {
        Rank::ALL
            .into_iter()
            .rev()
            .find_map(|rank| match self.data(levels, rank) {
                Some(NodeData::Scalar(scalar)) if !scalar.is_null() => Some(scalar.clone()),
                _ => None,
            })
            .unwrap_or(Scalar::Null)
    }
}

/// Resolve `path` over the ranks in `mask`, one level at a time.
pub fn resolve(levels: &Levels, mask: RankMask, path: &[Segment]) -> Option<FrozenValue> {
    let mut cell = MergeCell::root(levels, mask);
    for (index, segment) in path.iter().enumerate() {
        match cell.child(levels, segment)? {
            Resolved::Cell(next) => cell = next,
            Resolved::Scalar(scalar) if index + 1 == path.len() => {
                return Some(FrozenValue::Scalar(scalar));
            }
            Resolved::Scalar(_) => return None,
        }
    }
    Some(cell.materialize(levels))
}
