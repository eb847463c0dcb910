//! The catalog of known benchmarks and their built-in defaults.

use flotilla_config::RawNode;
use flotilla_config::node::yaml;
use indexmap::IndexMap;

pub mod builder;
mod builtin;

pub use builder::Builder;

/// A known benchmark.
#[derive(Clone, Debug)]
pub struct Entry {
    /// The name of the benchmark.
    name: String,

    /// A short description of the benchmark.
    description: Option<String>,

    /// The built-in default specification.
    defaults: RawNode,

    /// Flags restricted to a set of allowed values.
    choices: IndexMap<String, Vec<RawNode>>,
}

impl Entry {
    /// Creates a new [`Builder`] for an [`Entry`].
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the description (if any).
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Gets the built-in default specification.
    pub fn defaults(&self) -> &RawNode {
        &self.defaults
    }

    /// Gets the allowed values of every restricted flag.
    pub fn choices(&self) -> &IndexMap<String, Vec<RawNode>> {
        &self.choices
    }

    /// Gets the allowed values of the flag `name` (if it is restricted).
    pub fn choices_for(&self, name: &str) -> Option<&[RawNode]> {
        self.choices.get(name).map(Vec::as_slice)
    }
}

/// The set of benchmarks a document may refer to.
#[derive(Clone, Debug)]
pub struct Catalog {
    /// The entries, keyed by name.
    entries: IndexMap<String, Entry>,
}

impl Catalog {
    /// Creates a catalog with no benchmarks in it.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Creates a catalog containing the built-in benchmarks.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        for (name, description, defaults, choices) in builtin::ENTRIES {
            // SAFETY: the built-in defaults are static and each is parsed in
            // the tests below, so this will always unwrap.
            let defaults = yaml::parse(defaults).unwrap();

            let entry = choices.iter().fold(
                Entry::builder()
                    .name(*name)
                    .description(*description)
                    .defaults(defaults),
                |builder, (flag, values)| builder.choice(*flag, values.iter().copied()),
            );

            // SAFETY: the built-in names are valid, their references are all
            // defined, and every required field is set above, so this will
            // always unwrap.
            catalog.register(entry.try_build().unwrap());
        }

        catalog
    }

    /// Registers a benchmark.
    ///
    /// Returns the previously registered entry with the same name (if any).
    pub fn register(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    /// Gets the number of known benchmarks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether or not the catalog has no benchmarks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gets the entry for `name` (if it is known).
    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Whether or not `name` is a known benchmark.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Gets the names of all known benchmarks.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
