//! Resolution of named references within a document.
//!
//! Resolution happens in two phases:
//!
//! 1. [`ReferenceTable::collect()`] walks the whole tree once and records every
//!    [anchor](RawNode::Anchor) by name. Because the table is complete before
//!    anything is expanded, a definition may appear anywhere in the document
//!    relative to its uses.
//! 2. [`ReferenceTable::materialize()`] rebuilds the tree, replacing every
//!    [alias](RawNode::Alias) with a freshly built copy of the subtree it
//!    names. No two use-sites ever share structure.

use flotilla_config::KeyPath;
use flotilla_config::RawNode;
use flotilla_config::node::Mapping;
use indexmap::IndexMap;
use tracing::debug;
use tracing::trace;

use crate::Error;
use crate::Result;
use crate::name;

/// A recorded definition.
#[derive(Debug)]
struct Definition {
    /// The (unexpanded) subtree.
    node: RawNode,

    /// Where the definition was found.
    path: KeyPath,
}

/// A mapping from reference name to the subtree it denotes.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    /// The definitions, in the order they were found.
    definitions: IndexMap<String, Definition>,
}

impl ReferenceTable {
    /// Walks `root` and records every anchor it contains.
    ///
    /// Anchors nested within other anchors are recorded as well. Defining the
    /// same name twice is an error.
    pub fn collect(root: &RawNode) -> Result<Self> {
        let mut table = Self::default();
        table.record(root, &KeyPath::root())?;
        debug!("collected {} reference definition(s)", table.len());
        Ok(table)
    }

    /// Gets the number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether or not the table has no definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Gets the names of all definitions in the order they were found.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    /// Gets the unexpanded subtree defined as `name`.
    pub fn get(&self, name: &str) -> Option<&RawNode> {
        self.definitions.get(name).map(|definition| &definition.node)
    }

    /// Records the anchors found within `node`.
    fn record(&mut self, node: &RawNode, path: &KeyPath) -> Result<()> {
        match node {
            RawNode::Anchor { name, node: inner } => {
                if !name::is_valid(name) {
                    return Err(Error::mismatch(path, name::EXPECTED, format!("`{name}`")));
                }

                if let Some(first) = self.definitions.get(name) {
                    return Err(Error::DuplicateName {
                        kind: "reference",
                        name: name.clone(),
                        path: path.clone(),
                        first: first.path.clone(),
                    });
                }

                self.definitions.insert(name.clone(), Definition {
                    node: (**inner).clone(),
                    path: path.clone(),
                });

                self.record(inner, path)
            }
            RawNode::Sequence(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, item)| self.record(item, &path.index(i))),
            RawNode::Mapping(entries) => entries
                .iter()
                .try_for_each(|(key, value)| self.record(value, &path.key(key.as_str()))),
            _ => Ok(()),
        }
    }

    /// Returns a copy of `root` with every reference expanded.
    ///
    /// Each alias is replaced by an independent copy of the subtree it names,
    /// and each anchor is replaced by its (expanded) subtree. The result never
    /// contains [`RawNode::Anchor`] or [`RawNode::Alias`].
    pub fn materialize(&self, root: &RawNode) -> Result<RawNode> {
        let mut visiting = Vec::new();
        self.expand(root, &KeyPath::root(), &mut visiting)
    }

    /// Expands `node`, tracking the references currently being expanded in
    /// `visiting`.
    fn expand(&self, node: &RawNode, path: &KeyPath, visiting: &mut Vec<String>) -> Result<RawNode> {
        match node {
            RawNode::Alias(name) => {
                if !name::is_valid(name) {
                    return Err(Error::mismatch(path, name::EXPECTED, format!("`{name}`")));
                }

                let definition =
                    self.definitions
                        .get(name)
                        .ok_or_else(|| Error::UndefinedReference {
                            name: name.clone(),
                            path: path.clone(),
                        })?;

                trace!("expanding `*{name}` at `{path}`");
                self.enter(name, &definition.node, path, visiting)
            }
            RawNode::Anchor { name, node } => self.enter(name, node, path, visiting),
            RawNode::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.expand(item, &path.index(i), visiting))
                .collect::<Result<Vec<_>>>()
                .map(RawNode::Sequence),
            RawNode::Mapping(entries) => entries
                .iter()
                .map(|(key, value)| {
                    self.expand(value, &path.key(key.as_str()), visiting)
                        .map(|value| (key.clone(), value))
                })
                .collect::<Result<Mapping>>()
                .map(RawNode::Mapping),
            scalar => Ok(scalar.clone()),
        }
    }

    /// Expands the subtree of the reference `name`, failing if `name` is
    /// already being expanded.
    fn enter(
        &self,
        name: &str,
        node: &RawNode,
        path: &KeyPath,
        visiting: &mut Vec<String>,
    ) -> Result<RawNode> {
        if visiting.iter().any(|visited| visited == name) {
            let mut chain = visiting.clone();
            chain.push(name.to_string());

            return Err(Error::CircularReference {
                name: name.to_string(),
                chain,
                path: path.clone(),
            });
        }

        visiting.push(name.to_string());
        let result = self.expand(node, path, visiting);
        visiting.pop();
        result
    }
}

/// Resolves every reference in `root`.
///
/// This is a convenience for [`ReferenceTable::collect()`] followed by
/// [`ReferenceTable::materialize()`].
pub fn resolve(root: &RawNode) -> Result<RawNode> {
    ReferenceTable::collect(root)?.materialize(root)
}

#[cfg(test)]
mod tests {
    use flotilla_config::node::yaml;

    use super::*;

    #[test]
    fn aliases_expand_to_their_definitions() {
        let root = yaml::parse_document(
            r#"
benchmarks:
  - iperf:
      vm_groups:
        vm_1:
          vm_spec: !ref shape
shape:
  GCP:
    machine_type: n1-standard-4
"#,
        )
        .unwrap();

        let resolved = resolve(&root).unwrap();
        assert!(!resolved.has_references());

        let benchmarks = resolved.get("benchmarks").unwrap().as_sequence().unwrap();
        let vm_spec = benchmarks[0]
            .get("iperf")
            .and_then(|node| node.get("vm_groups"))
            .and_then(|node| node.get("vm_1"))
            .and_then(|node| node.get("vm_spec"))
            .unwrap();
        assert_eq!(vm_spec, resolved.get("shape").unwrap());
    }

    #[test]
    fn undefined_references_are_reported_with_their_path() {
        let root = yaml::parse_document("static_vms:\n  - !ref missing\n").unwrap();
        let err = resolve(&root).unwrap_err();
        assert_eq!(
            err.to_string(),
            "undefined reference `missing` at `static_vms[0]`"
        );
    }

    #[test]
    fn direct_cycles_are_reported() {
        let root = yaml::parse_document("loop:\n  inner: !ref loop\n").unwrap();
        let err = resolve(&root).unwrap_err();
        assert!(matches!(
            err,
            Error::CircularReference { ref name, ref chain, .. }
                if name == "loop" && chain == &["loop", "loop"]
        ));
    }

    #[test]
    fn transitive_cycles_are_reported() {
        let root = yaml::parse_document("a:\n  next: !ref b\nb:\n  next: !ref a\n").unwrap();
        let err = resolve(&root).unwrap_err();
        assert_eq!(
            err.to_string(),
            "circular reference `a` at `a.next.next` (via a -> b -> a)"
        );
    }

    #[test]
    fn duplicate_definitions_are_rejected() {
        let mut entries = Mapping::new();
        entries.insert(String::from("first"), RawNode::anchor("shape", RawNode::Null));
        entries.insert(String::from("second"), RawNode::anchor("shape", RawNode::Null));

        let err = ReferenceTable::collect(&RawNode::Mapping(entries)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "duplicate reference `shape` at `second` (first declared at `first`)"
        );
    }

    #[test]
    fn nested_anchors_are_recorded() {
        let inner = RawNode::anchor("disk", RawNode::from("/scratch"));
        let mut entries = Mapping::new();
        entries.insert(String::from("mount_point"), inner);
        let root = RawNode::anchor("machine", RawNode::Mapping(entries));

        let table = ReferenceTable::collect(&root).unwrap();
        assert_eq!(table.names().collect::<Vec<_>>(), ["machine", "disk"]);
        assert_eq!(table.get("disk"), Some(&RawNode::from("/scratch")));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let err = resolve(&RawNode::alias("not valid")).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }
}
