//! Dotted key paths used to locate values within a document.

use std::fmt;

/// A single step within a [`KeyPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),

    /// A sequence index.
    Index(usize),
}

/// The location of a node within a document (e.g.,
/// `benchmarks[1].iperf.vm_groups.vm_1.vm_spec`).
///
/// Paths are cheap to extend: every method returns a new path and leaves the
/// original untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<Segment>);

impl KeyPath {
    /// The path of the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether or not this is the path of the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a new path with `key` appended.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Key(key.into()));
        Self(segments)
    }

    /// Returns a new path with `index` appended.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(Segment::Index(index));
        Self(segments)
    }

    /// Gets the segments of the path.
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Gets the segments following `prefix` if this path starts with it.
    pub fn strip_prefix(&self, prefix: &KeyPath) -> Option<&[Segment]> {
        self.0.strip_prefix(prefix.segments())
    }

    /// Returns a new path with `segments` appended.
    pub fn join(&self, segments: &[Segment]) -> Self {
        let mut joined = self.0.clone();
        joined.extend_from_slice(segments);
        Self(joined)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "<root>");
        }

        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }

        Ok(())
    }
}
