//! Core types shared by the attribute engine
//!
//! Precedence ranks and their families, path segments and scalar leaves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten precedence ranks, declared in ascending precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Default,
    EnvDefault,
    RoleDefault,
    ForceDefault,
    Normal,
    Override,
    RoleOverride,
    EnvOverride,
    ForceOverride,
    Automatic,
}

impl Rank {
    pub const COUNT: usize = 10;

    /// All ranks, lowest precedence first.
    pub const ALL: [Rank; Rank::COUNT] = [
        Rank::Default,
        Rank::EnvDefault,
        Rank::RoleDefault,
        Rank::ForceDefault,
        Rank::Normal,
        Rank::Override,
        Rank::RoleOverride,
        Rank::EnvOverride,
        Rank::ForceOverride,
        Rank::Automatic,
    ];

    /// Position in [`Rank::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Default => "default",
            Rank::EnvDefault => "env_default",
            Rank::RoleDefault => "role_default",
            Rank::ForceDefault => "force_default",
            Rank::Normal => "normal",
            Rank::Override => "override",
            Rank::RoleOverride => "role_override",
            Rank::EnvOverride => "env_override",
            Rank::ForceOverride => "force_override",
            Rank::Automatic => "automatic",
        }
    }

    pub fn family(self) -> Family {
        match self {
            Rank::Default | Rank::EnvDefault | Rank::RoleDefault | Rank::ForceDefault => {
                Family::Default
            }
            Rank::Normal => Family::Normal,
            Rank::Override | Rank::RoleOverride | Rank::EnvOverride | Rank::ForceOverride => {
                Family::Override
            }
            Rank::Automatic => Family::Automatic,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rank::ALL
            .iter()
            .copied()
            .find(|rank| rank.as_str() == s)
            .ok_or_else(|| format!("unknown precedence rank '{}'", s))
    }
}

/// Sequence merging is scoped to a family: sibling ranks concatenate,
/// families replace each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Family {
    Default,
    Normal,
    Override,
    Automatic,
}

impl Family {
    /// Families, highest precedence first.
    pub const DESCENDING: [Family; 4] = [
        Family::Automatic,
        Family::Override,
        Family::Normal,
        Family::Default,
    ];

    /// Member ranks in ascending precedence order.
    pub fn ranks(self) -> &'static [Rank] {
        match self {
            Family::Default => &Rank::ALL[0..4],
            Family::Normal => &Rank::ALL[4..5],
            Family::Override => &Rank::ALL[5..9],
            Family::Automatic => &Rank::ALL[9..10],
        }
    }
}

/// Set of ranks taking part in a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankMask(u16);

impl RankMask {
    pub const ALL: RankMask = RankMask(0b11_1111_1111);
    pub const DEFAULTS: RankMask = RankMask(0b00_0000_1111);
    pub const OVERRIDES: RankMask = RankMask(0b01_1110_0000);

    pub fn only(rank: Rank) -> Self {
        RankMask(1 << rank.index())
    }

    pub fn contains(self, rank: Rank) -> bool {
        self.0 & (1 << rank.index()) != 0
    }
}

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    /// Sequence position; negative values count from the end.
    Index(i64),
}

impl Segment {
    /// The mapping key this segment addresses. Indices address the key spelled
    /// as their decimal form.
    pub fn as_key(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Segment::Key(key) => std::borrow::Cow::Borrowed(key),
            Segment::Index(index) => std::borrow::Cow::Owned(index.to_string()),
        }
    }

    /// Resolve against a sequence of `len` elements.
    pub fn resolve_index(&self, len: usize) -> Option<usize> {
        match self {
            Segment::Key(_) => None,
            Segment::Index(index) if *index >= 0 => Some(*index as usize),
            Segment::Index(index) => {
                let from_end = index.unsigned_abs() as usize;
                len.checked_sub(from_end)
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => f.write_str(key),
            Segment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<&String> for Segment {
    fn from(key: &String) -> Self {
        Segment::Key(key.clone())
    }
}

impl From<i32> for Segment {
    fn from(index: i32) -> Self {
        Segment::Index(index as i64)
    }
}

impl From<i64> for Segment {
    fn from(index: i64) -> Self {
        Segment::Index(index)
    }
}

impl From<usize> for Segment {
    fn from(index: usize) -> Self {
        Segment::Index(index as i64)
    }
}

/// Render a segment slice as a canonical `/a/b/0` path string.
pub fn display_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        out.push_str(&segment.to_string());
        out
    })
}

/// Parse a `/a/b/0` string into segments. Purely numeric components become
/// indices.
pub fn parse_path(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<i64>() {
            Ok(index) => Segment::Index(index),
            Err(_) => Segment::Key(part.to_string()),
        })
        .collect()
}

/// Build a `&[Segment]` path from keys and indices.
///
/// ```
/// use node_attrs::{path, Segment};
/// let p = path!["network", "interfaces", 0];
/// assert_eq!(p[2], Segment::Index(0));
/// ```
#[macro_export]
macro_rules! path {
    () => {
        &[] as &[$crate::Segment]
    };
    ($($segment:expr),+ $(,)?) => {
        &[$($crate::Segment::from($segment)),+]
    };
}

/// Leaf value held by a level or produced by a merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Scalar::Null => serde_json::Value::Null,
            Scalar::Bool(b) => serde_json::Value::Bool(*b),
            Scalar::Number(n) => serde_json::Value::Number(n.clone()),
            Scalar::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Convert a non-container JSON value. Containers yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Scalar> {
        match value {
            serde_json::Value::Null => Some(Scalar::Null),
            serde_json::Value::Bool(b) => Some(Scalar::Bool(*b)),
            serde_json::Value::Number(n) => Some(Scalar::Number(n.clone())),
            serde_json::Value::String(s) => Some(Scalar::String(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => f.write_str(s),
        }
    }
}
