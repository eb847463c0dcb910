//! Pre-existing ("static") machines.

use std::fmt;

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

use crate::vm::Binding;
use crate::vm::DiskSpec;

/// The default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Whether packages may be installed on a static machine by default.
pub const DEFAULT_INSTALL_PACKAGES: bool = true;

/// A utility function used to set the default value for `ssh_port` via serde.
fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

/// A utility function used to set the default value for `install_packages` via
/// serde.
fn default_install_packages() -> bool {
    DEFAULT_INSTALL_PACKAGES
}

/// The identity of a static machine within a pool.
///
/// Two machines with the same address and port are the same physical resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MachineId {
    /// The address.
    pub ip_address: String,

    /// The SSH port.
    pub ssh_port: u16,
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip_address, self.ssh_port)
    }
}

/// A pre-existing machine with fixed connection and hardware attributes.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct StaticMachine {
    /// The address used to connect to the machine.
    #[builder(into)]
    ip_address: String,

    /// The address of the machine on its internal network.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    internal_ip: Option<String>,

    /// The user to connect as.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,

    /// A reference to the credentials used to connect.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssh_private_key: Option<String>,

    /// The SSH port.
    #[builder(default = DEFAULT_SSH_PORT)]
    #[serde(default = "default_ssh_port")]
    ssh_port: u16,

    /// The operating system family.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os_type: Option<String>,

    /// The zone the machine lives in.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,

    /// The disks already present on the machine.
    #[builder(into, default)]
    #[serde(default)]
    disks: Vec<DiskSpec>,

    /// Whether packages may be installed on the machine.
    #[builder(default = DEFAULT_INSTALL_PACKAGES)]
    #[serde(default = "default_install_packages")]
    install_packages: bool,
}

impl StaticMachine {
    /// Gets the identity of the machine.
    pub fn id(&self) -> MachineId {
        MachineId {
            ip_address: self.ip_address.clone(),
            ssh_port: self.ssh_port,
        }
    }

    /// Gets the address.
    pub fn ip_address(&self) -> &str {
        &self.ip_address
    }

    /// Gets the internal address (if specified).
    pub fn internal_ip(&self) -> Option<&str> {
        self.internal_ip.as_deref()
    }

    /// Gets the user name (if specified).
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// Gets the credentials reference (if specified).
    pub fn ssh_private_key(&self) -> Option<&str> {
        self.ssh_private_key.as_deref()
    }

    /// Gets the SSH port.
    pub fn ssh_port(&self) -> u16 {
        self.ssh_port
    }

    /// Gets the operating system family (if specified).
    pub fn os_type(&self) -> Option<&str> {
        self.os_type.as_deref()
    }

    /// Gets the zone (if specified).
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Gets the disks.
    pub fn disks(&self) -> &[DiskSpec] {
        &self.disks
    }

    /// Gets the disk mounted at `mount_point` (if one exists).
    pub fn disk(&self, mount_point: &str) -> Option<&DiskSpec> {
        self.disks
            .iter()
            .find(|disk| disk.mount_point() == mount_point)
    }

    /// Whether packages may be installed.
    pub fn install_packages(&self) -> bool {
        self.install_packages
    }

    /// Gets the connection details used when binding a VM to this machine.
    pub fn binding(&self) -> Binding {
        Binding {
            ip_address: self.ip_address.clone(),
            internal_ip: self.internal_ip.clone(),
            user_name: self.user_name.clone(),
            ssh_private_key: self.ssh_private_key.clone(),
            ssh_port: self.ssh_port,
            install_packages: self.install_packages,
        }
    }
}
