//! The pool of static machines available to one resolution pass.

use flotilla_config::StaticMachine;
use tracing::trace;

use crate::matcher::Assignment;

/// The group instantiation that holds a machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Claim {
    /// The name of the benchmark.
    benchmark: String,

    /// The sequence index of the run within its benchmark name.
    sequence: usize,

    /// The name of the VM group.
    group: String,
}

impl Claim {
    /// Creates a new claim.
    pub fn new(benchmark: impl Into<String>, sequence: usize, group: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            sequence,
            group: group.into(),
        }
    }

    /// Gets the name of the benchmark.
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Gets the sequence index of the run.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Gets the name of the VM group.
    pub fn group(&self) -> &str {
        &self.group
    }
}

impl std::fmt::Display for Claim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}].{}", self.benchmark, self.sequence, self.group)
    }
}

/// The declared static machines along with their claims.
///
/// Claims are scoped to a single pool. A fresh pool is built for every
/// resolution pass, so no claim ever outlives the pass that made it.
#[derive(Debug, Default)]
pub struct StaticMachinePool {
    /// The machines in declaration order.
    machines: Vec<StaticMachine>,

    /// The claim held on each machine (if any), indexed like `machines`.
    claims: Vec<Option<Claim>>,
}

impl StaticMachinePool {
    /// Creates a pool where no machine is claimed.
    pub fn new(machines: Vec<StaticMachine>) -> Self {
        let claims = vec![None; machines.len()];
        Self { machines, claims }
    }

    /// Gets the machines in declaration order.
    pub fn machines(&self) -> &[StaticMachine] {
        &self.machines
    }

    /// Gets the machine at `index` (if it exists).
    pub fn get(&self, index: usize) -> Option<&StaticMachine> {
        self.machines.get(index)
    }

    /// Gets the number of machines.
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Whether or not the pool has no machines.
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Whether or not the machine at `index` is claimed.
    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed_by(index).is_some()
    }

    /// Gets the claim held on the machine at `index` (if any).
    pub fn claimed_by(&self, index: usize) -> Option<&Claim> {
        self.claims.get(index).and_then(Option::as_ref)
    }

    /// Gets the unclaimed machines (with their indices) in declaration order.
    pub fn unclaimed(&self) -> impl Iterator<Item = (usize, &StaticMachine)> {
        self.machines
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_claimed(*index))
    }

    /// Gets the number of unclaimed machines.
    pub fn available(&self) -> usize {
        self.claims.iter().filter(|claim| claim.is_none()).count()
    }

    /// Claims every machine in `assignment` on behalf of `claim`.
    ///
    /// The assignment must have been found against the current claim state.
    pub fn claim(&mut self, assignment: &Assignment, claim: Claim) {
        for index in assignment.indices() {
            debug_assert!(
                !self.is_claimed(*index),
                "machine {index} is already claimed"
            );

            if let Some(slot) = self.claims.get_mut(*index) {
                trace!("claiming machine {index} for `{claim}`");
                *slot = Some(claim.clone());
            }
        }
    }

    /// Releases every machine in `assignment`.
    pub fn release(&mut self, assignment: &Assignment) {
        for index in assignment.indices() {
            if let Some(slot) = self.claims.get_mut(*index) {
                trace!("releasing machine {index}");
                *slot = None;
            }
        }
    }
}
