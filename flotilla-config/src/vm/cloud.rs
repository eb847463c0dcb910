//! Cloud providers that a VM may be provisioned from.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// The cloud name that selects pre-existing static machines.
pub const STATIC: &str = "Static";

/// Where a virtual machine comes from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Cloud {
    /// A pre-existing machine drawn from the static machine pool.
    Static,

    /// A machine provisioned by the named provider (e.g., `GCP` or `AWS`).
    Provider(String),
}

impl Cloud {
    /// Whether or not this refers to the static machine pool.
    pub fn is_static(&self) -> bool {
        matches!(self, Cloud::Static)
    }

    /// Gets the name of the cloud as written in configuration.
    pub fn name(&self) -> &str {
        match self {
            Cloud::Static => STATIC,
            Cloud::Provider(name) => name,
        }
    }
}

impl From<&str> for Cloud {
    fn from(name: &str) -> Self {
        if name.eq_ignore_ascii_case(STATIC) {
            Cloud::Static
        } else {
            Cloud::Provider(name.to_string())
        }
    }
}

impl From<String> for Cloud {
    fn from(name: String) -> Self {
        if name.eq_ignore_ascii_case(STATIC) {
            Cloud::Static
        } else {
            Cloud::Provider(name)
        }
    }
}

impl From<Cloud> for String {
    fn from(cloud: Cloud) -> Self {
        match cloud {
            Cloud::Static => String::from(STATIC),
            Cloud::Provider(name) => name,
        }
    }
}

impl fmt::Display for Cloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
