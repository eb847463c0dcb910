//! Matching of static machine requests against the static machine pool.
//!
//! Matching is first-fit in pool declaration order: the first `vm_count`
//! unclaimed machines that the group selects and that are compatible with the
//! group are chosen. Searching ([`find()`]) never mutates the pool, so the same
//! claim state always produces the same assignment. Claiming is a separate step
//! ([`StaticMachinePool::claim()`]) which lets the caller release claims when a
//! later step fails.

use flotilla_config::KeyPath;
use flotilla_config::StaticMachine;
use flotilla_config::VmGroup;
use flotilla_config::benchmark::os_matches;
use flotilla_config::vm::DiskSpec;
use nonempty::NonEmpty;
use tracing::debug;

pub mod pool;

pub use pool::Claim;
pub use pool::StaticMachinePool;

use crate::Error;
use crate::Result;

/// The machines chosen for one group instantiation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// The indices of the machines within the pool, in pool order.
    indices: NonEmpty<usize>,
}

impl Assignment {
    /// Creates a new assignment.
    pub fn new(indices: NonEmpty<usize>) -> Self {
        Self { indices }
    }

    /// Gets the pool indices of the assigned machines.
    pub fn indices(&self) -> impl Iterator<Item = &usize> {
        self.indices.iter()
    }

    /// Gets the number of assigned machines.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Gets the assigned machines from `pool`.
    pub fn machines<'a>(
        &'a self,
        pool: &'a StaticMachinePool,
    ) -> impl Iterator<Item = &'a StaticMachine> + 'a {
        self.indices.iter().filter_map(|index| pool.get(*index))
    }
}

/// Whether or not `machine` already has a disk satisfying `required`.
fn satisfies(required: &DiskSpec, machine: &StaticMachine) -> bool {
    machine
        .disk(required.mount_point())
        .is_some_and(|disk| {
            required
                .disk_size()
                .is_none_or(|size| disk.disk_size().is_some_and(|actual| actual >= size))
                && required
                    .disk_type()
                    .is_none_or(|kind| disk.disk_type() == Some(kind))
        })
}

/// Whether or not `machine` can serve as an instance of `group`.
///
/// The OS type must match when the group names one, and every required disk
/// must already be present. Partial compatibility is incompatibility.
pub fn is_compatible(group: &VmGroup, machine: &StaticMachine) -> bool {
    os_matches(group.os_type(), machine.os_type())
        && group
            .disks()
            .iter()
            .all(|required| satisfies(required, machine))
}

/// Whether or not `group` selects `machine`.
///
/// A group without selectors selects every machine.
pub fn is_selected(group: &VmGroup, machine: &StaticMachine) -> bool {
    let selectors = group.selectors();
    selectors.is_empty() || selectors.iter().any(|selector| selector.matches(machine))
}

/// Finds the machines that `group` would claim from `pool`.
///
/// The pool is not modified.
pub fn find(
    benchmark: &str,
    group: &VmGroup,
    pool: &StaticMachinePool,
    path: &KeyPath,
) -> Result<Assignment> {
    let candidates = pool
        .unclaimed()
        .filter(|(_, machine)| is_selected(group, machine) && is_compatible(group, machine))
        .map(|(index, _)| index)
        .collect::<Vec<_>>();

    let insufficient = |available| Error::InsufficientStaticResources {
        benchmark: benchmark.to_string(),
        group: group.name().to_string(),
        required: group.vm_count(),
        available,
        path: path.clone(),
    };

    if candidates.len() < group.vm_count() {
        return Err(insufficient(candidates.len()));
    }

    let available = candidates.len();
    NonEmpty::from_vec(candidates.into_iter().take(group.vm_count()).collect())
        .map(Assignment::new)
        .ok_or_else(|| insufficient(available))
}

/// Finds and claims the machines for `group` within `pool`.
pub fn match_group(
    benchmark: &str,
    sequence: usize,
    group: &VmGroup,
    pool: &mut StaticMachinePool,
    path: &KeyPath,
) -> Result<Assignment> {
    let assignment = find(benchmark, group, pool, path)?;
    pool.claim(&assignment, Claim::new(benchmark, sequence, group.name()));

    debug!(
        "claimed {} static machine(s) for group `{}` of `{benchmark}` ({} remaining)",
        assignment.len(),
        group.name(),
        pool.available()
    );

    Ok(assignment)
}

#[cfg(test)]
mod tests {
    use flotilla_config::benchmark::Placement;
    use flotilla_config::benchmark::Selector;
    use flotilla_config::vm::Cloud;
    use flotilla_config::VmSpec;

    use super::*;

    fn scratch(size: Option<u64>) -> DiskSpec {
        DiskSpec::builder()
            .mount_point("/scratch")
            .maybe_disk_size(size)
            .build()
    }

    fn machine(ip: &str, os: Option<&str>, disks: Vec<DiskSpec>) -> StaticMachine {
        StaticMachine::builder()
            .ip_address(ip)
            .maybe_os_type(os)
            .disks(disks)
            .build()
    }

    fn group(count: usize, os: Option<&str>, disks: Vec<DiskSpec>) -> VmGroup {
        group_with(count, os, disks, Vec::new())
    }

    fn group_with(
        count: usize,
        os: Option<&str>,
        disks: Vec<DiskSpec>,
        selectors: Vec<Selector>,
    ) -> VmGroup {
        VmGroup::builder()
            .name("vm_1")
            .vm_count(count)
            .placement(Placement::Static { selectors })
            .vm_spec(
                VmSpec::builder()
                    .cloud(Cloud::Static)
                    .maybe_os_type(os)
                    .disks(disks)
                    .build(),
            )
            .build()
    }

    fn path() -> KeyPath {
        KeyPath::root().key("benchmarks").index(0)
    }

    #[test]
    fn a_compatible_machine_is_claimed() {
        let mut pool = StaticMachinePool::new(vec![machine(
            "10.0.0.4",
            Some("rhel"),
            vec![scratch(None)],
        )]);

        let group = group(1, Some("rhel"), vec![scratch(None)]);
        let assignment = match_group("fio", 0, &group, &mut pool, &path()).unwrap();

        assert_eq!(assignment.indices().copied().collect::<Vec<_>>(), [0]);
        assert_eq!(pool.claimed_by(0).unwrap().benchmark(), "fio");
    }

    #[test]
    fn insufficient_machines_are_reported() {
        let pool = StaticMachinePool::new(vec![machine(
            "10.0.0.4",
            Some("rhel"),
            vec![scratch(None)],
        )]);

        let err = find("fio", &group(2, Some("rhel"), vec![scratch(None)]), &pool, &path())
            .unwrap_err();

        assert!(matches!(
            err,
            Error::InsufficientStaticResources {
                required: 2,
                available: 1,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "insufficient static machines for group `vm_1` of benchmark `fio` at \
             `benchmarks[0]`: 2 required, 1 available"
        );
    }

    #[test]
    fn os_types_compare_case_insensitively() {
        let group = group(1, Some("RHEL"), Vec::new());
        assert!(is_compatible(&group, &machine("10.0.0.4", Some("rhel"), Vec::new())));
        assert!(!is_compatible(&group, &machine("10.0.0.4", Some("debian"), Vec::new())));
        assert!(!is_compatible(&group, &machine("10.0.0.4", None, Vec::new())));
    }

    #[test]
    fn groups_without_an_os_accept_any_machine() {
        let group = group(1, None, Vec::new());
        assert!(is_compatible(&group, &machine("10.0.0.4", None, Vec::new())));
        assert!(is_compatible(&group, &machine("10.0.0.4", Some("debian"), Vec::new())));
    }

    #[test]
    fn partial_disk_matches_are_incompatible() {
        let group = group(1, None, vec![scratch(Some(200))]);

        assert!(!is_compatible(&group, &machine("10.0.0.4", None, Vec::new())));
        assert!(!is_compatible(&group, &machine("10.0.0.4", None, vec![scratch(None)])));
        assert!(!is_compatible(&group, &machine("10.0.0.4", None, vec![scratch(Some(100))])));
        assert!(is_compatible(&group, &machine("10.0.0.4", None, vec![scratch(Some(500))])));
    }

    #[test]
    fn disk_types_must_be_equal() {
        let required = DiskSpec::builder()
            .mount_point("/scratch")
            .disk_type("local-ssd")
            .build();
        let group = group(1, None, vec![required]);

        let present = DiskSpec::builder()
            .mount_point("/scratch")
            .disk_type("pd-standard")
            .build();
        assert!(!is_compatible(&group, &machine("10.0.0.4", None, vec![present])));
    }

    #[test]
    fn matching_is_first_fit_and_exclusive() {
        let mut pool = StaticMachinePool::new(vec![
            machine("10.0.0.1", Some("debian"), Vec::new()),
            machine("10.0.0.2", Some("rhel"), Vec::new()),
            machine("10.0.0.3", Some("rhel"), Vec::new()),
            machine("10.0.0.4", Some("rhel"), Vec::new()),
        ]);
        let group = group(2, Some("rhel"), Vec::new());

        let first = find("fio", &group, &pool, &path()).unwrap();
        assert_eq!(first, find("fio", &group, &pool, &path()).unwrap());
        assert_eq!(first.indices().copied().collect::<Vec<_>>(), [1, 2]);

        pool.claim(&first, Claim::new("fio", 0, "vm_1"));
        let err = find("fio", &group, &pool, &path()).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientStaticResources { available: 1, .. }
        ));

        pool.release(&first);
        assert_eq!(find("fio", &group, &pool, &path()).unwrap(), first);
    }

    #[test]
    fn selectors_restrict_candidates() {
        let pool = StaticMachinePool::new(vec![
            machine("10.0.0.1", Some("rhel"), Vec::new()),
            machine("10.0.0.2", Some("rhel"), Vec::new()),
        ]);

        let group = group_with(1, None, Vec::new(), vec![
            Selector::builder().ip_address("10.0.0.2").build(),
        ]);

        let assignment = find("ping", &group, &pool, &path()).unwrap();
        assert_eq!(
            assignment
                .machines(&pool)
                .map(StaticMachine::ip_address)
                .collect::<Vec<_>>(),
            ["10.0.0.2"]
        );
    }
}
