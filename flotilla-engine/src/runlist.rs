//! Interpretation of the `benchmarks` run list.

use flotilla_config::KeyPath;
use flotilla_config::RawNode;
use tracing::warn;

use crate::Error;
use crate::Result;
use crate::name;

/// The top-level key holding the run list.
pub const KEY: &str = "benchmarks";

/// One declared occurrence of a benchmark in the run list.
#[derive(Clone, Debug, PartialEq)]
pub struct RunListEntry {
    /// The position of the entry within the run list.
    index: usize,

    /// The name of the benchmark.
    name: String,

    /// The override tree (null when the entry uses the defaults).
    over: RawNode,

    /// The path of the entry's override.
    path: KeyPath,
}

impl RunListEntry {
    /// Gets the position of the entry within the run list.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Gets the name of the benchmark.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the override tree.
    pub fn over(&self) -> &RawNode {
        &self.over
    }

    /// Gets the path of the entry (`benchmarks[i].name`).
    pub fn path(&self) -> &KeyPath {
        &self.path
    }
}

/// Parses a single entry of the run list.
fn entry(index: usize, node: &RawNode, path: &KeyPath) -> Result<RunListEntry> {
    let (name, over) = match node {
        RawNode::String(name) => (name.clone(), RawNode::Null),
        RawNode::Mapping(entries) if entries.len() == 1 => entries
            .iter()
            .next()
            .map(|(name, over)| (name.clone(), over.clone()))
            .ok_or_else(|| Error::mismatch(path, "a single-key mapping", "an empty mapping"))?,
        RawNode::Mapping(entries) => {
            return Err(Error::mismatch(
                path,
                "a single-key mapping",
                format!("a mapping with {} keys", entries.len()),
            ));
        }
        node => {
            return Err(Error::mismatch(
                path,
                "a benchmark name or a single-key mapping",
                node.kind(),
            ));
        }
    };

    if !name::is_valid(&name) {
        return Err(Error::mismatch(path, name::EXPECTED, format!("`{name}`")));
    }

    let path = path.key(name.as_str());
    Ok(RunListEntry {
        index,
        name,
        over,
        path,
    })
}

/// Parses the run list of the (reference-free) document `root`.
///
/// Entries are returned in declaration order. An absent (or null) run list is
/// empty.
pub fn parse(root: &RawNode) -> Result<Vec<RunListEntry>> {
    let path = KeyPath::root().key(KEY);

    let list = match root.get(KEY) {
        None | Some(RawNode::Null) => {
            warn!("the document has no `{KEY}` run list; nothing will be run");
            return Ok(Vec::new());
        }
        Some(node) => node
            .as_sequence()
            .ok_or_else(|| Error::mismatch(&path, "sequence", node.kind()))?,
    };

    list.iter()
        .enumerate()
        .map(|(index, node)| entry(index, node, &path.index(index)))
        .collect()
}
