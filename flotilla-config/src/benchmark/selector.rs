//! Selectors that restrict which static machines a group may claim.

use bon::Builder;
use serde::Deserialize;
use serde::Serialize;

use crate::machine::StaticMachine;

/// Attributes a static machine must have to be selected.
///
/// Every attribute that is set must equal the machine's attribute. A selector
/// with nothing set selects every machine.
#[derive(Builder, Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[builder(builder_type = Builder)]
pub struct Selector {
    /// The address of the machine.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip_address: Option<String>,

    /// The SSH port of the machine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ssh_port: Option<u16>,

    /// The user name of the machine.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,

    /// The operating system family of the machine.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os_type: Option<String>,

    /// The zone of the machine.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zone: Option<String>,
}

impl Selector {
    /// Whether or not `machine` is selected.
    pub fn matches(&self, machine: &StaticMachine) -> bool {
        fn same(wanted: Option<&str>, actual: Option<&str>) -> bool {
            wanted.is_none_or(|wanted| actual == Some(wanted))
        }

        same(self.ip_address.as_deref(), Some(machine.ip_address()))
            && self.ssh_port.is_none_or(|port| port == machine.ssh_port())
            && same(self.user_name.as_deref(), machine.user_name())
            && os_matches(self.os_type.as_deref(), machine.os_type())
            && same(self.zone.as_deref(), machine.zone())
    }
}

/// Whether or not a machine's operating system satisfies a requested one.
///
/// An unspecified request accepts any machine; otherwise the machine must
/// declare the same family (compared case-insensitively).
pub fn os_matches(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match (wanted, actual) {
        (None, _) => true,
        (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
        (Some(_), None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selectors_select_everything() {
        let machine = StaticMachine::builder().ip_address("10.0.0.4").build();
        assert!(Selector::default().matches(&machine));
    }

    #[test]
    fn every_set_attribute_must_match() {
        let machine = StaticMachine::builder()
            .ip_address("10.0.0.4")
            .os_type("RHEL")
            .build();

        let selector = Selector::builder()
            .ip_address("10.0.0.4")
            .os_type("rhel")
            .build();
        assert!(selector.matches(&machine));

        let selector = Selector::builder()
            .ip_address("10.0.0.4")
            .zone("us-east-1a")
            .build();
        assert!(!selector.matches(&machine));
    }
}
