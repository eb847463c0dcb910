//! The untyped document tree handed to the engine by a loader.
//!
//! A [`RawNode`] is schema-free: it is only converted into strongly-typed
//! configuration objects (see [`crate::benchmark`], [`crate::vm`] and
//! [`crate::machine`]) after references are resolved and overrides are merged.

use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

pub mod path;
pub mod yaml;

pub use path::KeyPath;
pub use path::Segment;

/// An ordered mapping of keys to nodes.
///
/// Keys are unique and insertion order is preserved so that output is
/// deterministic.
pub type Mapping = IndexMap<String, RawNode>;

/// A node within an untyped document tree.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawNode {
    /// An explicit null (or an absent value).
    #[default]
    Null,

    /// A boolean scalar.
    Bool(bool),

    /// An integer scalar.
    Integer(i64),

    /// A floating point scalar.
    Float(f64),

    /// A string scalar.
    String(String),

    /// An ordered sequence.
    Sequence(Vec<RawNode>),

    /// An ordered mapping.
    Mapping(Mapping),

    /// A named definition that may be referred to by an [alias](RawNode::Alias).
    #[serde(skip)]
    Anchor {
        /// The name of the definition.
        name: String,

        /// The subtree being defined.
        node: Box<RawNode>,
    },

    /// A use-site of a named definition.
    #[serde(skip)]
    Alias(String),
}

impl RawNode {
    /// Creates an anchor named `name` wrapping `node`.
    pub fn anchor(name: impl Into<String>, node: RawNode) -> Self {
        Self::Anchor {
            name: name.into(),
            node: Box::new(node),
        }
    }

    /// Creates an alias referring to `name`.
    pub fn alias(name: impl Into<String>) -> Self {
        Self::Alias(name.into())
    }

    /// Gets a short, human-readable name for the shape of this node.
    ///
    /// This is used when reporting type mismatches.
    pub fn kind(&self) -> &'static str {
        match self {
            RawNode::Null => "null",
            RawNode::Bool(_) => "boolean",
            RawNode::Integer(_) => "integer",
            RawNode::Float(_) => "float",
            RawNode::String(_) => "string",
            RawNode::Sequence(_) => "sequence",
            RawNode::Mapping(_) => "mapping",
            RawNode::Anchor { .. } => "anchor",
            RawNode::Alias(_) => "alias",
        }
    }

    /// Whether or not the node is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RawNode::Null)
    }

    /// Whether or not the node is a (non-null) scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            RawNode::Bool(_) | RawNode::Integer(_) | RawNode::Float(_) | RawNode::String(_)
        )
    }

    /// Whether or not the node still contains unresolved anchors or aliases.
    pub fn has_references(&self) -> bool {
        match self {
            RawNode::Anchor { .. } | RawNode::Alias(_) => true,
            RawNode::Sequence(items) => items.iter().any(RawNode::has_references),
            RawNode::Mapping(entries) => entries.values().any(RawNode::has_references),
            _ => false,
        }
    }

    /// Attempts to return a reference to the inner mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            RawNode::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Attempts to return a reference to the inner sequence.
    pub fn as_sequence(&self) -> Option<&[RawNode]> {
        match self {
            RawNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to return the inner string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawNode::String(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the value for `key` if this node is a mapping containing it.
    pub fn get(&self, key: &str) -> Option<&RawNode> {
        self.as_mapping().and_then(|entries| entries.get(key))
    }

    /// Gets the node found by following `segments` from this node.
    pub fn at(&self, segments: &[Segment]) -> Option<&RawNode> {
        segments
            .iter()
            .try_fold(self, |node, segment| match (node, segment) {
                (RawNode::Mapping(entries), Segment::Key(key)) => entries.get(key),
                (RawNode::Sequence(items), Segment::Index(index)) => items.get(*index),
                _ => None,
            })
    }

    /// Renders a scalar as a string.
    ///
    /// Returns [`None`] for mappings, sequences and references.
    pub fn scalar_to_string(&self) -> Option<String> {
        match self {
            RawNode::Null => Some(String::from("null")),
            RawNode::Bool(value) => Some(value.to_string()),
            RawNode::Integer(value) => Some(value.to_string()),
            RawNode::Float(value) => Some(value.to_string()),
            RawNode::String(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for RawNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNode::Sequence(items) => write!(f, "<sequence of {}>", items.len()),
            RawNode::Mapping(entries) => write!(f, "<mapping of {}>", entries.len()),
            RawNode::Anchor { name, .. } => write!(f, "&{name}"),
            RawNode::Alias(name) => write!(f, "*{name}"),
            scalar => match scalar.scalar_to_string() {
                Some(value) => write!(f, "{value}"),
                None => Ok(()),
            },
        }
    }
}

impl From<&str> for RawNode {
    fn from(value: &str) -> Self {
        RawNode::String(value.to_string())
    }
}

impl From<String> for RawNode {
    fn from(value: String) -> Self {
        RawNode::String(value)
    }
}

impl From<i64> for RawNode {
    fn from(value: i64) -> Self {
        RawNode::Integer(value)
    }
}

impl From<bool> for RawNode {
    fn from(value: bool) -> Self {
        RawNode::Bool(value)
    }
}

impl From<Mapping> for RawNode {
    fn from(entries: Mapping) -> Self {
        RawNode::Mapping(entries)
    }
}

impl From<Vec<RawNode>> for RawNode {
    fn from(items: Vec<RawNode>) -> Self {
        RawNode::Sequence(items)
    }
}
