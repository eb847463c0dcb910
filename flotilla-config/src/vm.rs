//! Configuration describing individual virtual machines.

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

mod cloud;
mod disk;

pub use cloud::Cloud;
pub use cloud::STATIC;
pub use disk::DiskSpec;

use crate::machine::StaticMachine;
use crate::node::Mapping;

/// The connection details of the static machine a [`VmSpec`] is bound to.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Binding {
    /// The address used to connect to the machine.
    pub ip_address: String,

    /// The address of the machine on its internal network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_ip: Option<String>,

    /// The user to connect as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// A reference to the credentials (e.g., the path of a private key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_private_key: Option<String>,

    /// The SSH port.
    pub ssh_port: u16,

    /// Whether packages may be installed on the machine.
    pub install_packages: bool,
}

/// The resolved attributes of a single virtual machine.
#[derive(Builder, Clone, Debug, PartialEq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct VmSpec {
    /// The cloud the machine comes from.
    #[builder(into)]
    cloud: Cloud,

    /// The machine type (or shape).
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    machine_type: Option<String>,

    /// The zone the machine lives in.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,

    /// The operating system family.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os_type: Option<String>,

    /// The disks, in declaration order.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    disks: Vec<DiskSpec>,

    /// The static machine this spec is bound to (if any).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    binding: Option<Binding>,

    /// Any other provider-specific attributes, passed through untouched.
    #[builder(into, default)]
    #[serde(default, skip_serializing_if = "Mapping::is_empty")]
    attributes: Mapping,
}

impl VmSpec {
    /// Gets the cloud.
    pub fn cloud(&self) -> &Cloud {
        &self.cloud
    }

    /// Gets the machine type (if specified).
    pub fn machine_type(&self) -> Option<&str> {
        self.machine_type.as_deref()
    }

    /// Gets the zone (if specified).
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Gets the operating system family (if specified).
    pub fn os_type(&self) -> Option<&str> {
        self.os_type.as_deref()
    }

    /// Gets the disks.
    pub fn disks(&self) -> &[DiskSpec] {
        &self.disks
    }

    /// Gets the static machine binding (if bound).
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Gets the passthrough attributes.
    pub fn attributes(&self) -> &Mapping {
        &self.attributes
    }

    /// Whether or not the spec requires a machine to be provisioned from a
    /// cloud provider.
    pub fn requests_provisioning(&self) -> bool {
        !self.cloud.is_static()
    }

    /// Returns a copy of this spec bound to `machine`.
    ///
    /// The bound spec never requests provisioning: its cloud is always
    /// [`Cloud::Static`] and its machine type is dropped. The operating system
    /// and zone are taken from the machine, and each required disk is replaced
    /// by the machine's disk at the same mount point.
    pub fn bind(&self, machine: &StaticMachine) -> Self {
        let disks = self
            .disks
            .iter()
            .map(|required| {
                machine
                    .disk(required.mount_point())
                    .cloned()
                    .unwrap_or_else(|| required.clone())
            })
            .collect();

        Self {
            cloud: Cloud::Static,
            machine_type: None,
            zone: machine.zone().map(str::to_string).or(self.zone.clone()),
            os_type: machine
                .os_type()
                .map(str::to_string)
                .or(self.os_type.clone()),
            disks,
            binding: Some(machine.binding()),
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_drops_provisioning() {
        let template = VmSpec::builder()
            .cloud(Cloud::Static)
            .os_type("rhel")
            .disks(vec![DiskSpec::builder().mount_point("/scratch").build()])
            .build();

        let machine = StaticMachine::builder()
            .ip_address("10.0.0.4")
            .os_type("rhel")
            .disks(vec![
                DiskSpec::builder()
                    .mount_point("/scratch")
                    .disk_size(500)
                    .build(),
            ])
            .build();

        let bound = template.bind(&machine);
        assert!(!bound.requests_provisioning());
        assert_eq!(bound.binding().unwrap().ip_address, "10.0.0.4");
        assert_eq!(bound.binding().unwrap().ssh_port, 22);
        assert_eq!(bound.disks()[0].disk_size(), Some(500));
    }
}
