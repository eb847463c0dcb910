//! The engine that resolves Flotilla documents.
//!
//! A document is resolved in stages, each producing a new tree:
//!
//! 1. [References](reference) are expanded into independent copies.
//! 2. The declared [static machines](matcher::StaticMachinePool) are validated
//!    into a fresh pool.
//! 3. The [run list](runlist) is read in declaration order.
//! 4. For each entry, the [catalog](catalog) defaults, the document's
//!    top-level configuration for that benchmark and the entry's override are
//!    [merged](merge), [validated](validate) and [matched](matcher) against the
//!    pool.
//!
//! The result is an ordered list of [`BenchmarkRun`]s.

use flotilla_config::FailurePolicy;
use flotilla_config::KeyPath;
use flotilla_config::RawNode;
use flotilla_config::Settings;
use flotilla_config::node::yaml;
use tracing::debug;
use tracing::warn;

pub mod catalog;
mod error;
pub mod matcher;
pub mod merge;
mod name;
mod pass;
pub mod reference;
pub mod run;
pub mod runlist;
pub mod validate;

pub use catalog::Catalog;
pub use error::Error;
pub use error::Result;
pub use run::BenchmarkRun;
pub use run::Resolution;
pub use run::Skipped;

use crate::matcher::StaticMachinePool;
use crate::pass::Pass;

/// The top-level key holding the static machine pool.
pub const STATIC_VMS_KEY: &str = "static_vms";

/// A document resolution engine.
///
/// The engine holds no per-document state: every call to
/// [`resolve()`](Engine::resolve) builds its own pass (and its own static
/// machine pool), so one engine may resolve many documents concurrently.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    /// The known benchmarks.
    catalog: Catalog,

    /// The engine settings.
    settings: Settings,
}

impl Engine {
    /// Creates a new engine.
    pub fn new(catalog: Catalog, settings: Settings) -> Self {
        Self { catalog, settings }
    }

    /// Replaces the settings of the engine.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers a benchmark with the engine's catalog.
    ///
    /// A built-in benchmark with the same name is replaced.
    pub fn with_benchmark(mut self, entry: catalog::Entry) -> Self {
        if let Some(previous) = self.catalog.register(entry) {
            debug!("replaced the catalog entry for `{}`", previous.name());
        }

        self
    }

    /// Gets the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Gets the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Resolves a document into its runs.
    ///
    /// Document-level failures (references, the static machine pool and the
    /// shape of the run list) always abort. Failures of individual run-list
    /// entries abort or are skipped depending on the
    /// [failure policy](FailurePolicy).
    pub fn resolve(&self, document: &RawNode) -> Result<Resolution> {
        let root = reference::resolve(document)?;

        if !matches!(root, RawNode::Null | RawNode::Mapping(_)) {
            return Err(Error::mismatch(&KeyPath::root(), "mapping", root.kind()));
        }

        let machines = validate::static_machines(
            root.get(STATIC_VMS_KEY),
            &KeyPath::root().key(STATIC_VMS_KEY),
        )?;
        debug!("declared {} static machine(s)", machines.len());

        let entries = runlist::parse(&root)?;
        let mut pass = Pass::new(&self.catalog, &root, StaticMachinePool::new(machines));

        let mut runs = Vec::with_capacity(entries.len());
        let mut skipped = Vec::new();

        for entry in &entries {
            match pass.resolve_entry(entry) {
                Ok(run) => runs.push(run),
                Err(err) => match self.settings.failure_policy() {
                    FailurePolicy::AbortBatch => return Err(err),
                    FailurePolicy::SkipEntry => {
                        warn!(
                            "skipping run-list entry {} (`{}`): {err}",
                            entry.index(),
                            entry.name()
                        );
                        skipped.push(Skipped::new(
                            entry.index(),
                            entry.name().to_string(),
                            err,
                        ));
                    }
                },
            }
        }

        debug!(
            "resolved {} run(s) ({} skipped, {} of {} static machine(s) unclaimed)",
            runs.len(),
            skipped.len(),
            pass.pool().available(),
            pass.pool().len()
        );

        Ok(Resolution::new(runs, skipped))
    }

    /// Parses and resolves a YAML document.
    ///
    /// Native anchors and aliases are resolved by the engine (so an alias may
    /// precede its anchor), and every top-level key other than `static_vms`
    /// and `benchmarks` may be referred to by name.
    pub fn resolve_str(&self, text: &str) -> Result<Resolution> {
        let document = yaml::parse_document(text)?;
        self.resolve(&document)
    }
}
