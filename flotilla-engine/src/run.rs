//! The output of a resolution pass.

use flotilla_config::BenchmarkSpec;
use serde::Serialize;

use crate::Error;

/// A runnable benchmark configuration.
///
/// Runs are never modified once created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BenchmarkRun {
    /// The name of the benchmark.
    name: String,

    /// The index of this run among the runs of the same benchmark.
    sequence: usize,

    /// The position of the originating entry within the run list.
    entry: usize,

    /// The fully resolved specification.
    spec: BenchmarkSpec,
}

impl BenchmarkRun {
    /// Creates a new run.
    pub(crate) fn new(name: String, sequence: usize, entry: usize, spec: BenchmarkSpec) -> Self {
        Self {
            name,
            sequence,
            entry,
            spec,
        }
    }

    /// Gets the name of the benchmark.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the sequence index of the run.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Gets the position of the originating run-list entry.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Gets the resolved specification.
    pub fn spec(&self) -> &BenchmarkSpec {
        &self.spec
    }

    /// Consumes `self` and returns the resolved specification.
    pub fn into_spec(self) -> BenchmarkSpec {
        self.spec
    }
}

/// A run-list entry that failed and was skipped.
#[derive(Debug)]
pub struct Skipped {
    /// The position of the entry within the run list.
    entry: usize,

    /// The name of the benchmark.
    benchmark: String,

    /// Why the entry failed.
    error: Error,
}

impl Skipped {
    /// Creates a new skipped entry.
    pub(crate) fn new(entry: usize, benchmark: String, error: Error) -> Self {
        Self {
            entry,
            benchmark,
            error,
        }
    }

    /// Gets the position of the entry within the run list.
    pub fn entry(&self) -> usize {
        self.entry
    }

    /// Gets the name of the benchmark.
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Gets the error that caused the entry to be skipped.
    pub fn error(&self) -> &Error {
        &self.error
    }
}

/// The result of resolving a document.
#[derive(Debug, Default)]
pub struct Resolution {
    /// The runs in run-list order.
    runs: Vec<BenchmarkRun>,

    /// The entries that were skipped (only populated under the skip-entry
    /// policy).
    skipped: Vec<Skipped>,
}

impl Resolution {
    /// Creates a new resolution.
    pub(crate) fn new(runs: Vec<BenchmarkRun>, skipped: Vec<Skipped>) -> Self {
        Self { runs, skipped }
    }

    /// Gets the runs in run-list order.
    pub fn runs(&self) -> &[BenchmarkRun] {
        &self.runs
    }

    /// Gets the skipped entries in run-list order.
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// Whether or not every entry resolved.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Consumes `self` and returns the runs.
    pub fn into_runs(self) -> Vec<BenchmarkRun> {
        self.runs
    }
}
