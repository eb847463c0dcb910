//! Groups of virtual machines within a benchmark.

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

use crate::benchmark::Selector;
use crate::vm::DiskSpec;
use crate::vm::VmSpec;

/// Where the machines of a [`VmGroup`] come from.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "PascalCase")]
pub enum Placement {
    /// Machines are provisioned from the group's cloud provider.
    Cloud,

    /// Machines are claimed from the static machine pool.
    Static {
        /// The selectors restricting the candidate machines.
        ///
        /// A machine is a candidate if it matches any selector. When empty,
        /// every machine in the pool is a candidate.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        selectors: Vec<Selector>,
    },
}

/// A named cluster role within a benchmark.
#[derive(Builder, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct VmGroup {
    /// The name of the group.
    #[builder(into)]
    name: String,

    /// The number of machines the group requires.
    vm_count: usize,

    /// Where the machines come from.
    placement: Placement,

    /// The template every machine in the group is created from.
    vm_spec: VmSpec,

    /// The concrete machines, once resolved.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    instances: Vec<VmSpec>,
}

impl VmGroup {
    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the number of machines required.
    pub fn vm_count(&self) -> usize {
        self.vm_count
    }

    /// Gets the placement.
    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    /// Whether or not the group draws from the static machine pool.
    pub fn is_static(&self) -> bool {
        matches!(self.placement, Placement::Static { .. })
    }

    /// Gets the selectors restricting the candidate static machines.
    ///
    /// This is empty for cloud groups.
    pub fn selectors(&self) -> &[Selector] {
        match &self.placement {
            Placement::Static { selectors } => selectors,
            Placement::Cloud => &[],
        }
    }

    /// Gets the template spec.
    pub fn vm_spec(&self) -> &VmSpec {
        &self.vm_spec
    }

    /// Gets the required operating system family (if any).
    pub fn os_type(&self) -> Option<&str> {
        self.vm_spec.os_type()
    }

    /// Gets the required disks.
    pub fn disks(&self) -> &[DiskSpec] {
        self.vm_spec.disks()
    }

    /// Gets the concrete machines.
    ///
    /// This is empty until the group has been resolved.
    pub fn instances(&self) -> &[VmSpec] {
        &self.instances
    }

    /// Overrides the concrete machines of the group.
    pub fn override_instances(&mut self, instances: Vec<VmSpec>) {
        self.instances = instances;
    }
}
