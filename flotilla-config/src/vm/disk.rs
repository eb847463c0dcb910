//! Disk specifications.

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

/// A disk attached to (or required of) a machine.
#[derive(Builder, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct DiskSpec {
    /// The path at which the disk is mounted.
    #[builder(into)]
    mount_point: String,

    /// The size of the disk in gigabytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disk_size: Option<u64>,

    /// The provider-specific type of the disk (e.g., `pd-ssd`).
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disk_type: Option<String>,
}

impl DiskSpec {
    /// Gets the mount point.
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    /// Gets the size of the disk in gigabytes (if specified).
    pub fn disk_size(&self) -> Option<u64> {
        self.disk_size
    }

    /// Gets the type of the disk (if specified).
    pub fn disk_type(&self) -> Option<&str> {
        self.disk_type.as_deref()
    }
}
