//! Copy-on-Write Views
//!
//! Borrowing wrappers over plain JSON mappings and sequences. Every transform
//! returns a new detached value and leaves the wrapped original untouched, so
//! a shallow filter never needs a deep clone of the source up front.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Read-only view over a borrowed mapping
#[derive(Debug, Clone, Copy)]
pub struct CowMap<'a> {
    inner: &'a Map<String, Value>,
}

impl<'a> CowMap<'a> {
    pub fn new(inner: &'a Map<String, Value>) -> Self {
        Self { inner }
    }

    /// View over `value` if it is a mapping.
    pub fn of(value: &'a Value) -> Option<Self> {
        value.as_object().map(Self::new)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.inner.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Entries for which `predicate` holds.
    pub fn select(&self, mut predicate: impl FnMut(&str, &Value) -> bool) -> Map<String, Value> {
        self.inner
            .iter()
            .filter(|(key, value)| predicate(key.as_str(), *value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn reject(&self, mut predicate: impl FnMut(&str, &Value) -> bool) -> Map<String, Value> {
        self.select(|key, value| !predicate(key, value))
    }

    /// Everything except `keys`.
    pub fn except(&self, keys: &[&str]) -> Map<String, Value> {
        self.reject(|key, _| keys.contains(&key))
    }

    /// Only `keys`, in the order given; missing keys are skipped.
    pub fn slice(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter_map(|key| Some((key.to_string(), self.inner.get(*key)?.clone())))
            .collect()
    }

    /// Drop entries whose value is null.
    pub fn compact(&self) -> Map<String, Value> {
        self.reject(|_, value| value.is_null())
    }

    pub fn map_values(&self, mut f: impl FnMut(&str, &Value) -> Value) -> Map<String, Value> {
        self.inner
            .iter()
            .map(|(key, value)| (key.clone(), f(key, value)))
            .collect()
    }

    /// Shallow merge: `other`'s entries win.
    pub fn merged_with(&self, other: &Map<String, Value>) -> Map<String, Value> {
        let mut out = self.inner.clone();
        out.extend(other.iter().map(|(key, value)| (key.clone(), value.clone())));
        out
    }
}

/// Read-only view over a borrowed sequence
#[derive(Debug, Clone, Copy)]
pub struct CowSeq<'a> {
    inner: &'a [Value],
}

impl<'a> CowSeq<'a> {
    pub fn new(inner: &'a [Value]) -> Self {
        Self { inner }
    }

    pub fn of(value: &'a Value) -> Option<Self> {
        value.as_array().map(|items| Self::new(items))
    }

    pub fn get(&self, index: usize) -> Option<&'a Value> {
        self.inner.get(index)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn select(&self, mut predicate: impl FnMut(&Value) -> bool) -> Vec<Value> {
        self.inner
            .iter()
            .filter(|item| predicate(*item))
            .cloned()
            .collect()
    }

    pub fn reject(&self, mut predicate: impl FnMut(&Value) -> bool) -> Vec<Value> {
        self.select(|item| !predicate(item))
    }

    pub fn compact(&self) -> Vec<Value> {
        self.reject(Value::is_null)
    }

    /// `len` items from `start`; empty past the end.
    pub fn slice(&self, start: usize, len: usize) -> Vec<Value> {
        self.inner.iter().skip(start).take(len).cloned().collect()
    }

    pub fn reversed(&self) -> Vec<Value> {
        self.inner.iter().rev().cloned().collect()
    }

    pub fn sorted_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) -> Vec<Value> {
        let mut out = self.inner.to_vec();
        out.sort_by(compare);
        out
    }

    /// First occurrence of each distinct item, in order.
    pub fn uniq(&self) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::with_capacity(self.inner.len());
        for item in self.inner {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
        out
    }

    pub fn map(&self, f: impl FnMut(&Value) -> Value) -> Vec<Value> {
        self.inner.iter().map(f).collect()
    }
}
