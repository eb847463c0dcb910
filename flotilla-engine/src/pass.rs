//! A single resolution pass over a document.

use std::collections::HashMap;

use flotilla_config::BenchmarkSpec;
use flotilla_config::KeyPath;
use flotilla_config::RawNode;
use tracing::debug;
use tracing::trace;

use crate::Error;
use crate::Result;
use crate::catalog::Catalog;
use crate::catalog::Entry;
use crate::matcher;
use crate::matcher::Assignment;
use crate::matcher::StaticMachinePool;
use crate::merge::merge_at;
use crate::run::BenchmarkRun;
use crate::runlist::RunListEntry;
use crate::validate;

/// The state owned by one resolution pass.
///
/// The pool (and therefore every claim) lives and dies with the pass.
#[derive(Debug)]
pub struct Pass<'a> {
    /// The benchmarks the document may refer to.
    catalog: &'a Catalog,

    /// The reference-free document.
    root: &'a RawNode,

    /// The static machines and their claims.
    pool: StaticMachinePool,

    /// The next sequence index for each benchmark name.
    sequences: HashMap<String, usize>,

    /// The built-in defaults merged with the document's top-level
    /// configuration, for each benchmark name seen so far.
    defaults: HashMap<String, RawNode>,
}

impl<'a> Pass<'a> {
    /// Creates a new pass.
    pub fn new(catalog: &'a Catalog, root: &'a RawNode, pool: StaticMachinePool) -> Self {
        Self {
            catalog,
            root,
            pool,
            sequences: Default::default(),
            defaults: Default::default(),
        }
    }

    /// Gets the pool.
    pub fn pool(&self) -> &StaticMachinePool {
        &self.pool
    }

    /// Hands out the next sequence index for `name`.
    fn next_sequence(&mut self, name: &str) -> usize {
        let next = self.sequences.entry(name.to_string()).or_default();
        let sequence = *next;
        *next += 1;
        sequence
    }

    /// Gets the defaults of `entry` layered with the document's top-level
    /// configuration for the same benchmark.
    fn defaults(&mut self, entry: &Entry) -> Result<RawNode> {
        if let Some(defaults) = self.defaults.get(entry.name()) {
            return Ok(defaults.clone());
        }

        let defaults = match self.root.get(entry.name()) {
            Some(document) => {
                merge_at(entry.defaults(), document, &KeyPath::root().key(entry.name()))?
            }
            None => entry.defaults().clone(),
        };

        trace!("cached the defaults of `{}`", entry.name());
        self.defaults
            .insert(entry.name().to_string(), defaults.clone());

        Ok(defaults)
    }

    /// Reports `err` at the document's top-level configuration for the
    /// benchmark when that is where the offending value came from.
    ///
    /// Validation runs on the merged tree, so its errors are found under the
    /// run-list entry even when the entry does not set the value.
    fn locate(&self, entry: &RunListEntry, err: Error) -> Error {
        let Some(rest) = err.path().and_then(|path| path.strip_prefix(entry.path())) else {
            return err;
        };

        let set = |node: Option<&RawNode>| {
            node.and_then(|node| node.at(rest))
                .is_some_and(|node| !node.is_null())
        };

        if set(Some(entry.over())) || !set(self.root.get(entry.name())) {
            return err;
        }

        let to = KeyPath::root().key(entry.name()).join(rest);
        trace!("moving `{}` to `{to}`", entry.path().join(rest));
        err.relocate(to)
    }

    /// Resolves one run-list entry into a run.
    ///
    /// If the entry fails, every machine it claimed is released before the
    /// error is returned.
    pub fn resolve_entry(&mut self, entry: &RunListEntry) -> Result<BenchmarkRun> {
        let catalog = self.catalog;
        let benchmark = catalog
            .get(entry.name())
            .ok_or_else(|| Error::UnknownBenchmark {
                name: entry.name().to_string(),
                path: entry.path().clone(),
            })?;

        let sequence = self.next_sequence(entry.name());
        let defaults = self.defaults(benchmark)?;
        let merged = merge_at(&defaults, entry.over(), entry.path())?;
        debug!(
            "merged the configuration of `{}` (run {sequence})",
            entry.name()
        );

        let mut spec = validate::benchmark_spec(benchmark, &merged, entry.path())
            .map_err(|err| self.locate(entry, err))?;
        self.instantiate(&mut spec, sequence, entry.path())?;

        Ok(BenchmarkRun::new(
            entry.name().to_string(),
            sequence,
            entry.index(),
            spec,
        ))
    }

    /// Creates the concrete instances of every group in `spec`, claiming
    /// static machines as needed.
    fn instantiate(
        &mut self,
        spec: &mut BenchmarkSpec,
        sequence: usize,
        path: &KeyPath,
    ) -> Result<()> {
        let benchmark = spec.name().to_string();
        let mut claimed: Vec<Assignment> = Vec::new();

        for group in spec.vm_groups_mut() {
            let instances = if group.is_static() {
                let path = path.key("vm_groups").key(group.name());

                match matcher::match_group(&benchmark, sequence, group, &mut self.pool, &path) {
                    Ok(assignment) => {
                        let instances = assignment
                            .machines(&self.pool)
                            .map(|machine| group.vm_spec().bind(machine))
                            .collect();
                        claimed.push(assignment);
                        instances
                    }
                    Err(err) => {
                        for assignment in &claimed {
                            self.pool.release(assignment);
                        }

                        return Err(err);
                    }
                }
            } else {
                vec![group.vm_spec().clone(); group.vm_count()]
            };

            group.override_instances(instances);
        }

        Ok(())
    }
}
