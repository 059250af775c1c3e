//! Frozen Projection
//!
//! Read-only wrappers returned from every merged read. Nested containers
//! read out of a frozen value are frozen too; every mutating operation fails
//! with `ImmutableAttributeModification`. Children are shared through `Arc`,
//! so transforms that return a new value never deep-copy untouched subtrees.

use crate::error::AttributeError;
use crate::types::{Scalar, Segment};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A fully merged, immutable attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum FrozenValue {
    Scalar(Scalar),
    Map(FrozenMap),
    Seq(FrozenSeq),
}

impl FrozenValue {
    pub fn null() -> Self {
        FrozenValue::Scalar(Scalar::Null)
    }

    /// Freeze a plain JSON value.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => FrozenValue::Map(FrozenMap::from_entries(
                map.iter()
                    .map(|(key, child)| (key.clone(), FrozenValue::from_json(child)))
                    .collect(),
            )),
            Value::Array(items) => {
                FrozenValue::Seq(FrozenSeq::from_items(items.iter().map(FrozenValue::from_json).collect()))
            }
            scalar => FrozenValue::Scalar(Scalar::from_json(scalar).unwrap_or(Scalar::Null)),
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            FrozenValue::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&FrozenMap> {
        match self {
            FrozenValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&FrozenSeq> {
        match self {
            FrozenValue::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_scalar().and_then(Scalar::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_scalar().and_then(Scalar::as_bool)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FrozenValue::Scalar(Scalar::Null))
    }

    /// Child addressed by one segment.
    pub fn get(&self, segment: &Segment) -> Option<&FrozenValue> {
        match self {
            FrozenValue::Map(map) => map.get(segment.as_key().as_ref()),
            FrozenValue::Seq(seq) => segment
                .resolve_index(seq.len())
                .and_then(|index| seq.get(index)),
            FrozenValue::Scalar(_) => None,
        }
    }

    pub fn get_path(&self, path: &[Segment]) -> Option<&FrozenValue> {
        path.iter().try_fold(self, |value, segment| value.get(segment))
    }

    /// Deep copy into an ordinary, independent JSON structure.
    pub fn to_mutable_copy(&self) -> Value {
        match self {
            FrozenValue::Scalar(scalar) => scalar.to_json(),
            FrozenValue::Map(map) => map.to_mutable_copy(),
            FrozenValue::Seq(seq) => seq.to_mutable_copy(),
        }
    }
}

impl PartialEq<Value> for FrozenValue {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (FrozenValue::Scalar(scalar), other) => {
                Scalar::from_json(other).is_some_and(|o| *scalar == o)
            }
            (FrozenValue::Map(map), Value::Object(other)) => {
                map.len() == other.len()
                    && other
                        .iter()
                        .all(|(key, value)| map.get(key).is_some_and(|mine| mine == value))
            }
            (FrozenValue::Seq(seq), Value::Array(other)) => {
                seq.len() == other.len() && seq.iter().zip(other).all(|(mine, theirs)| mine == theirs)
            }
            _ => false,
        }
    }
}

impl Serialize for FrozenValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FrozenValue::Scalar(scalar) => scalar.serialize(serializer),
            FrozenValue::Map(map) => map.serialize(serializer),
            FrozenValue::Seq(seq) => seq.serialize(serializer),
        }
    }
}

/// Frozen mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrozenMap {
    entries: Arc<BTreeMap<String, FrozenValue>>,
}

impl FrozenMap {
    /// Every mutating operation, each of which fails on a frozen mapping.
    pub const MUTATORS: &'static [&'static str] = &[
        "insert",
        "remove",
        "clear",
        "retain",
        "extend",
        "replace",
        "shift",
        "map_values_in_place",
        "entry_or_insert",
    ];

    pub fn from_entries(entries: BTreeMap<String, FrozenValue>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FrozenValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &FrozenValue> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrozenValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries satisfying `predicate`, as a new frozen mapping.
    pub fn select(&self, mut predicate: impl FnMut(&str, &FrozenValue) -> bool) -> FrozenMap {
        FrozenMap::from_entries(
            self.entries
                .iter()
                .filter(|(key, value)| predicate(key.as_str(), *value))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }

    /// Entries failing `predicate`, as a new frozen mapping.
    pub fn reject(&self, mut predicate: impl FnMut(&str, &FrozenValue) -> bool) -> FrozenMap {
        self.select(|key, value| !predicate(key, value))
    }

    /// Copy without the named keys.
    pub fn except(&self, keys: &[&str]) -> FrozenMap {
        self.reject(|key, _| keys.contains(&key))
    }

    /// New mapping with `other`'s entries layered on top (shallow).
    pub fn merge(&self, other: &FrozenMap) -> FrozenMap {
        let mut entries = (*self.entries).clone();
        entries.extend(other.iter().map(|(key, value)| (key.to_string(), value.clone())));
        FrozenMap::from_entries(entries)
    }

    pub fn to_mutable_copy(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_mutable_copy()))
                .collect(),
        )
    }

    pub fn insert(&self, _key: impl Into<String>, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("insert"))
    }

    pub fn remove(&self, _key: &str) -> Result<FrozenValue, AttributeError> {
        Err(AttributeError::immutable("remove"))
    }

    pub fn clear(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("clear"))
    }

    pub fn retain(&self, _keep: impl FnMut(&str, &FrozenValue) -> bool) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("retain"))
    }

    pub fn extend(&self, _entries: Value) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("extend"))
    }

    pub fn replace(&self, _entries: Value) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("replace"))
    }

    pub fn shift(&self) -> Result<(String, FrozenValue), AttributeError> {
        Err(AttributeError::immutable("shift"))
    }

    pub fn map_values_in_place(
        &self,
        _f: impl FnMut(&str, &FrozenValue) -> Value,
    ) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("map_values_in_place"))
    }

    pub fn entry_or_insert(&self, _key: &str, _value: impl Into<Value>) -> Result<&FrozenValue, AttributeError> {
        Err(AttributeError::immutable("entry_or_insert"))
    }
}

impl Serialize for FrozenMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.entries.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Frozen sequence
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrozenSeq {
    items: Arc<Vec<FrozenValue>>,
}

impl FrozenSeq {
    /// Every mutating operation, each of which fails on a frozen sequence.
    pub const MUTATORS: &'static [&'static str] = &[
        "push",
        "pop",
        "insert",
        "remove",
        "set",
        "clear",
        "sort",
        "sort_by_key_in_place",
        "reverse",
        "retain",
        "dedup",
        "truncate",
        "extend",
        "fill",
        "shift",
        "unshift",
        "compact",
        "flatten",
        "map_in_place",
        "replace",
    ];

    pub fn from_items(items: Vec<FrozenValue>) -> Self {
        Self {
            items: Arc::new(items),
        }
    }

    pub fn get(&self, index: usize) -> Option<&FrozenValue> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&FrozenValue> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&FrozenValue> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrozenValue> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, value: &FrozenValue) -> bool {
        self.items.contains(value)
    }

    pub fn select(&self, mut predicate: impl FnMut(&FrozenValue) -> bool) -> FrozenSeq {
        FrozenSeq::from_items(self.items.iter().filter(|item| predicate(*item)).cloned().collect())
    }

    pub fn reject(&self, mut predicate: impl FnMut(&FrozenValue) -> bool) -> FrozenSeq {
        self.select(|item| !predicate(item))
    }

    /// New sequence without null elements.
    pub fn compacted(&self) -> FrozenSeq {
        self.reject(FrozenValue::is_null)
    }

    /// New sequence in reverse order.
    pub fn reversed(&self) -> FrozenSeq {
        FrozenSeq::from_items(self.items.iter().rev().cloned().collect())
    }

    /// New sequence ordered by `key`.
    pub fn sorted_by_key<K: Ord>(&self, mut key: impl FnMut(&FrozenValue) -> K) -> FrozenSeq {
        let mut items: Vec<FrozenValue> = self.items.iter().cloned().collect();
        items.sort_by_key(|item| key(item));
        FrozenSeq::from_items(items)
    }

    /// New sequence with `other` appended.
    pub fn concat(&self, other: &FrozenSeq) -> FrozenSeq {
        FrozenSeq::from_items(self.items.iter().chain(other.iter()).cloned().collect())
    }

    pub fn to_mutable_copy(&self) -> Value {
        Value::Array(self.items.iter().map(FrozenValue::to_mutable_copy).collect())
    }

    pub fn push(&self, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("push"))
    }

    pub fn pop(&self) -> Result<FrozenValue, AttributeError> {
        Err(AttributeError::immutable("pop"))
    }

    pub fn insert(&self, _index: usize, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("insert"))
    }

    pub fn remove(&self, _index: usize) -> Result<FrozenValue, AttributeError> {
        Err(AttributeError::immutable("remove"))
    }

    pub fn set(&self, _index: usize, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("set"))
    }

    pub fn clear(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("clear"))
    }

    pub fn sort(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("sort"))
    }

    pub fn sort_by_key_in_place<K: Ord>(
        &self,
        _key: impl FnMut(&FrozenValue) -> K,
    ) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("sort_by_key_in_place"))
    }

    pub fn reverse(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("reverse"))
    }

    pub fn retain(&self, _keep: impl FnMut(&FrozenValue) -> bool) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("retain"))
    }

    pub fn dedup(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("dedup"))
    }

    pub fn truncate(&self, _len: usize) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("truncate"))
    }

    pub fn extend(&self, _values: Vec<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("extend"))
    }

    pub fn fill(&self, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("fill"))
    }

    pub fn shift(&self) -> Result<FrozenValue, AttributeError> {
        Err(AttributeError::immutable("shift"))
    }

    pub fn unshift(&self, _value: impl Into<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("unshift"))
    }

    pub fn compact(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("compact"))
    }

    pub fn flatten(&self) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("flatten"))
    }

    pub fn map_in_place(&self, _f: impl FnMut(&FrozenValue) -> Value) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("map_in_place"))
    }

    pub fn replace(&self, _values: Vec<Value>) -> Result<(), AttributeError> {
        Err(AttributeError::immutable("replace"))
    }
}

impl Serialize for FrozenSeq {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in self.items.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'a> IntoIterator for &'a FrozenSeq {
    type Item = &'a FrozenValue;
    type IntoIter = std::slice::Iter<'a, FrozenValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
