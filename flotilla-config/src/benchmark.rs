//! Fully merged benchmark configuration.

use bon::Builder;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

mod group;
mod selector;

pub use group::Placement;
pub use group::VmGroup;
pub use selector::Selector;
pub use selector::os_matches;

use crate::node::Mapping;
use crate::node::RawNode;

/// The fully merged, reference-free configuration for one benchmark.
#[derive(Builder, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct BenchmarkSpec {
    /// The name of the benchmark.
    #[builder(into)]
    name: String,

    /// A description of the benchmark.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    /// The VM groups, keyed by name.
    #[builder(into, default)]
    vm_groups: IndexMap<String, VmGroup>,

    /// Benchmark-specific scalar options.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    flags: Mapping,

    /// Any unrecognized keys, passed through untouched.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    options: Mapping,
}

impl BenchmarkSpec {
    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the description (if any).
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Gets the VM groups.
    pub fn vm_groups(&self) -> &IndexMap<String, VmGroup> {
        &self.vm_groups
    }

    /// Gets a VM group by name.
    pub fn vm_group(&self, name: &str) -> Option<&VmGroup> {
        self.vm_groups.get(name)
    }

    /// Gets a mutable iterator over the VM groups.
    pub fn vm_groups_mut(&mut self) -> impl Iterator<Item = &mut VmGroup> {
        self.vm_groups.values_mut()
    }

    /// Gets the benchmark-specific flags.
    pub fn flags(&self) -> &Mapping {
        &self.flags
    }

    /// Gets a flag by name.
    pub fn flag(&self, name: &str) -> Option<&RawNode> {
        self.flags.get(name)
    }

    /// Gets the passthrough options.
    pub fn options(&self) -> &Mapping {
        &self.options
    }

    /// Gets the total number of machines across all groups.
    pub fn vm_count(&self) -> usize {
        self.vm_groups.values().map(VmGroup::vm_count).sum()
    }
}
