//! Conversion of merged trees into typed configuration objects.
//!
//! This is the validation boundary: nothing about the shape of a document is
//! checked until it passes through here, and every failure names the dotted
//! path of the offending value.

use std::collections::HashMap;

use flotilla_config::benchmark::Placement;
use flotilla_config::benchmark::Selector;
use flotilla_config::machine::MachineId;
use flotilla_config::node::Mapping;
use flotilla_config::vm::Cloud;
use flotilla_config::BenchmarkSpec;
use flotilla_config::DiskSpec;
use flotilla_config::KeyPath;
use flotilla_config::RawNode;
use flotilla_config::StaticMachine;
use flotilla_config::VmGroup;
use flotilla_config::VmSpec;
use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::Entry;
use crate::name;
use crate::Error;
use crate::Result;

/// Keys of a benchmark that are interpreted by the engine.
const BENCHMARK_KEYS: [&str; 3] = ["vm_groups", "flags", "description"];

/// Keys of a `vm_spec` entry that are interpreted by the engine.
const VM_SPEC_KEYS: [&str; 2] = ["machine_type", "zone"];

//==================//
// Primitive values //
//==================//

/// Gets `node` as a mapping.
fn mapping<'a>(node: &'a RawNode, path: &KeyPath) -> Result<&'a Mapping> {
    node.as_mapping()
        .ok_or_else(|| Error::mismatch(path, "mapping", node.kind()))
}

/// Gets `node` as a sequence.
fn sequence<'a>(node: &'a RawNode, path: &KeyPath) -> Result<&'a [RawNode]> {
    node.as_sequence()
        .ok_or_else(|| Error::mismatch(path, "sequence", node.kind()))
}

/// Gets the value of `key` unless it is absent or null.
fn present<'a>(fields: &'a Mapping, key: &str) -> Option<&'a RawNode> {
    fields.get(key).filter(|node| !node.is_null())
}

/// Gets an optional string field.
fn string(fields: &Mapping, key: &str, path: &KeyPath) -> Result<Option<String>> {
    present(fields, key)
        .map(|node| {
            node.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::mismatch(&path.key(key), "string", node.kind()))
        })
        .transpose()
}

/// Gets an optional non-negative integer field.
fn unsigned(fields: &Mapping, key: &str, path: &KeyPath) -> Result<Option<u64>> {
    present(fields, key)
        .map(|node| match node {
            RawNode::Integer(value) => u64::try_from(*value)
                .map_err(|_| Error::invalid(&path.key(key), "must not be negative")),
            _ => Err(Error::mismatch(&path.key(key), "integer", node.kind())),
        })
        .transpose()
}

/// Gets an optional boolean field.
fn boolean(fields: &Mapping, key: &str, path: &KeyPath) -> Result<Option<bool>> {
    present(fields, key)
        .map(|node| match node {
            RawNode::Bool(value) => Ok(*value),
            _ => Err(Error::mismatch(&path.key(key), "boolean", node.kind())),
        })
        .transpose()
}

/// Gets an optional port field.
fn port(fields: &Mapping, key: &str, path: &KeyPath) -> Result<Option<u16>> {
    unsigned(fields, key, path)?
        .map(|port| {
            u16::try_from(port)
                .map_err(|_| Error::invalid(&path.key(key), format!("`{port}` is not a valid port")))
        })
        .transpose()
}

//=======//
// Disks //
//=======//

/// Converts a list of disks, ensuring mount points are unique.
fn disks(node: Option<&RawNode>, path: &KeyPath) -> Result<Vec<DiskSpec>> {
    let Some(node) = node.filter(|node| !node.is_null()) else {
        return Ok(Vec::new());
    };

    let mut seen = HashMap::new();
    let mut disks = Vec::new();

    for (i, item) in sequence(node, path)?.iter().enumerate() {
        let path = path.index(i);
        let fields = mapping(item, &path)?;

        let mount_point = string(fields, "mount_point", &path)?
            .ok_or_else(|| Error::invalid(&path, "missing required `mount_point`"))?;

        if let Some(first) = seen.insert(mount_point.clone(), path.clone()) {
            return Err(Error::DuplicateName {
                kind: "mount point",
                name: mount_point,
                path,
                first,
            });
        }

        disks.push(
            DiskSpec::builder()
                .mount_point(mount_point)
                .maybe_disk_size(unsigned(fields, "disk_size", &path)?)
                .maybe_disk_type(string(fields, "disk_type", &path)?)
                .build(),
        );
    }

    Ok(disks)
}

//==================//
// Static machines //
//==================//

/// Converts a single static machine descriptor.
pub fn static_machine(node: &RawNode, path: &KeyPath) -> Result<StaticMachine> {
    let fields = mapping(node, path)?;

    let ip_address = string(fields, "ip_address", path)?
        .ok_or_else(|| Error::invalid(path, "missing required `ip_address`"))?;

    Ok(StaticMachine::builder()
        .ip_address(ip_address)
        .maybe_internal_ip(string(fields, "internal_ip", path)?)
        .maybe_user_name(string(fields, "user_name", path)?)
        .maybe_ssh_private_key(string(fields, "ssh_private_key", path)?)
        .maybe_ssh_port(port(fields, "ssh_port", path)?)
        .maybe_os_type(string(fields, "os_type", path)?)
        .maybe_zone(string(fields, "zone", path)?)
        .disks(disks(fields.get("disk_specs"), &path.key("disk_specs"))?)
        .maybe_install_packages(boolean(fields, "install_packages", path)?)
        .build())
}

/// Converts the static machine pool declared at `path`.
///
/// An absent (or null) pool is empty. Machines must be unique by address and
/// port.
pub fn static_machines(node: Option<&RawNode>, path: &KeyPath) -> Result<Vec<StaticMachine>> {
    let Some(node) = node.filter(|node| !node.is_null()) else {
        return Ok(Vec::new());
    };

    let mut seen: HashMap<MachineId, KeyPath> = HashMap::new();
    let mut machines = Vec::new();

    for (i, item) in sequence(node, path)?.iter().enumerate() {
        let path = path.index(i);
        let machine = static_machine(item, &path)?;

        if let Some(first) = seen.insert(machine.id(), path.clone()) {
            return Err(Error::DuplicateName {
                kind: "static machine",
                name: machine.id().to_string(),
                path,
                first,
            });
        }

        machines.push(machine);
    }

    Ok(machines)
}

//===========//
// VM groups //
//===========//

/// Converts the selectors of a static group.
fn selectors(node: &RawNode, path: &KeyPath) -> Result<Vec<Selector>> {
    sequence(node, path)?
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let path = path.index(i);
            let fields = mapping(item, &path)?;

            Ok(Selector::builder()
                .maybe_ip_address(string(fields, "ip_address", &path)?)
                .maybe_ssh_port(port(fields, "ssh_port", &path)?)
                .maybe_user_name(string(fields, "user_name", &path)?)
                .maybe_os_type(string(fields, "os_type", &path)?)
                .maybe_zone(string(fields, "zone", &path)?)
                .build())
        })
        .collect()
}

/// Determines where the machines of a group come from.
///
/// Listing static machines selects static placement, even if the group would
/// otherwise be provisioned from a cloud (e.g., one inherited from the
/// defaults).
fn placement(
    cloud: Option<Cloud>,
    fields: &Mapping,
    path: &KeyPath,
) -> Result<(Placement, Cloud)> {
    let selectors = present(fields, "static_vms")
        .map(|node| selectors(node, &path.key("static_vms")))
        .transpose()?;

    match (cloud, selectors) {
        (Some(Cloud::Provider(provider)), Some(selectors)) if !selectors.is_empty() => {
            debug!("`{path}` selects static machines in place of cloud `{provider}`");
            Ok((Placement::Static { selectors }, Cloud::Static))
        }
        (Some(cloud @ Cloud::Provider(_)), _) => Ok((Placement::Cloud, cloud)),
        (Some(Cloud::Static), selectors) | (None, selectors @ Some(_)) => Ok((
            Placement::Static {
                selectors: selectors.unwrap_or_default(),
            },
            Cloud::Static,
        )),
        (None, None) => Err(Error::invalid(path, "missing required `cloud`")),
    }
}

/// Gets the `vm_spec` entry for `cloud` (matched case-insensitively).
fn vm_spec_entry<'a>(
    fields: &'a Mapping,
    cloud: &Cloud,
    path: &KeyPath,
) -> Result<Option<(KeyPath, &'a Mapping)>> {
    let Some(specs) = present(fields, "vm_spec") else {
        return Ok(None);
    };

    let path = path.key("vm_spec");

    mapping(specs, &path)?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(cloud.name()))
        .map(|(name, entry)| {
            let path = path.key(name.as_str());
            mapping(entry, &path).map(|entry| (path, entry))
        })
        .transpose()
}

/// Converts a single VM group.
pub fn vm_group(name: &str, node: &RawNode, path: &KeyPath) -> Result<VmGroup> {
    if !name::is_valid(name) {
        return Err(Error::mismatch(path, name::EXPECTED, format!("`{name}`")));
    }

    let fields = mapping(node, path)?;
    let cloud = string(fields, "cloud", path)?.map(Cloud::from);
    let (placement, cloud) = placement(cloud, fields, path)?;

    // One machine per selector unless a count is given.
    let vm_count = match (unsigned(fields, "vm_count", path)?, &placement) {
        (Some(count), _) => count,
        (None, Placement::Static { selectors }) if !selectors.is_empty() => selectors.len() as u64,
        (None, _) => 1,
    };
    if vm_count == 0 {
        return Err(Error::invalid(&path.key("vm_count"), "must be at least 1"));
    }
    let vm_count = usize::try_from(vm_count)
        .map_err(|_| Error::invalid(&path.key("vm_count"), "is too large"))?;

    let disks = disks(fields.get("disk_specs"), &path.key("disk_specs"))?;
    if let Some(disk_count) = unsigned(fields, "disk_count", path)? {
        if usize::try_from(disk_count).ok() != Some(disks.len()) {
            return Err(Error::invalid(
                &path.key("disk_count"),
                format!(
                    "declares {disk_count} disk(s) but `disk_specs` lists {}",
                    disks.len()
                ),
            ));
        }
    }

    let entry = vm_spec_entry(fields, &cloud, path)?;
    if entry.is_none() && matches!(placement, Placement::Cloud) {
        return Err(Error::invalid(
            &path.key("vm_spec"),
            format!("missing an entry for cloud `{cloud}`"),
        ));
    }

    let (machine_type, zone, attributes) = match entry {
        Some((path, entry)) => (
            string(entry, "machine_type", &path)?,
            string(entry, "zone", &path)?,
            entry
                .iter()
                .filter(|(key, _)| !VM_SPEC_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<Mapping>(),
        ),
        None => (None, None, Mapping::new()),
    };

    let vm_spec = VmSpec::builder()
        .cloud(cloud)
        .maybe_machine_type(machine_type)
        .maybe_zone(zone)
        .maybe_os_type(string(fields, "os_type", path)?)
        .disks(disks)
        .attributes(attributes)
        .build();

    Ok(VmGroup::builder()
        .name(name)
        .vm_count(vm_count)
        .placement(placement)
        .vm_spec(vm_spec)
        .build())
}

//============//
// Benchmarks //
//============//

/// Converts the flags of a benchmark, checking any restricted values.
fn flags(entry: &Entry, node: Option<&RawNode>, path: &KeyPath) -> Result<Mapping> {
    let Some(node) = node.filter(|node| !node.is_null()) else {
        return Ok(Mapping::new());
    };

    let path = path.key("flags");
    let mut flags = Mapping::new();

    for (flag, value) in mapping(node, &path)? {
        let path = path.key(flag.as_str());

        if !value.is_scalar() {
            return Err(Error::mismatch(&path, "scalar", value.kind()));
        }

        if let Some(allowed) = entry.choices_for(flag) {
            let rendered = value.scalar_to_string();

            if !allowed
                .iter()
                .any(|choice| choice.scalar_to_string() == rendered)
            {
                let allowed = allowed
                    .iter()
                    .map(|choice| format!("`{choice}`"))
                    .collect::<Vec<_>>()
                    .join(", ");

                return Err(Error::invalid(
                    &path,
                    format!("`{value}` is not one of {allowed}"),
                ));
            }
        }

        flags.insert(flag.clone(), value.clone());
    }

    Ok(flags)
}

/// Converts a fully merged benchmark tree into a [`BenchmarkSpec`].
pub fn benchmark_spec(entry: &Entry, node: &RawNode, path: &KeyPath) -> Result<BenchmarkSpec> {
    let empty = Mapping::new();
    let fields = match node {
        RawNode::Null => &empty,
        node => mapping(node, path)?,
    };

    let groups_path = path.key("vm_groups");
    let groups = present(fields, "vm_groups")
        .ok_or_else(|| Error::invalid(path, "missing required `vm_groups`"))
        .and_then(|node| mapping(node, &groups_path))?;

    if groups.is_empty() {
        return Err(Error::invalid(
            &groups_path,
            "at least one VM group is required",
        ));
    }

    let vm_groups = groups
        .iter()
        .map(|(name, group)| {
            vm_group(name, group, &groups_path.key(name.as_str()))
                .map(|group| (name.clone(), group))
        })
        .collect::<Result<IndexMap<_, _>>>()?;

    let description = string(fields, "description", path)?
        .or_else(|| entry.description().map(str::to_string));

    let options = fields
        .iter()
        .filter(|(key, _)| !BENCHMARK_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<Mapping>();

    Ok(BenchmarkSpec::builder()
        .name(entry.name())
        .maybe_description(description)
        .vm_groups(vm_groups)
        .flags(flags(entry, fields.get("flags"), path)?)
        .options(options)
        .build())
}

#[cfg(test)]
mod tests {
    use flotilla_config::node::yaml;

    use super::*;
    use crate::catalog::Catalog;

    fn node(text: &str) -> RawNode {
        yaml::parse(text).unwrap()
    }

    fn root() -> KeyPath {
        KeyPath::root().key("test")
    }

    #[test]
    fn machines_are_converted_with_defaults() {
        let machines = static_machines(
            Some(&node(
                r#"
- ip_address: 10.0.0.4
  user_name: perfkit
  ssh_private_key: /keys/perfkit
  os_type: rhel
  disk_specs:
    - mount_point: /scratch
      disk_size: 500
"#,
            )),
            &KeyPath::root().key("static_vms"),
        )
        .unwrap();

        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].ssh_port(), 22);
        assert_eq!(machines[0].user_name(), Some("perfkit"));
        assert_eq!(machines[0].disk("/scratch").unwrap().disk_size(), Some(500));
    }

    #[test]
    fn duplicate_machines_are_rejected() {
        let err = static_machines(
            Some(&node("- ip_address: 10.0.0.4\n- ip_address: 10.0.0.4\n  ssh_port: 22\n")),
            &KeyPath::root().key("static_vms"),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "duplicate static machine `10.0.0.4:22` at `static_vms[1]` (first declared at \
             `static_vms[0]`)"
        );
    }

    #[test]
    fn machines_require_an_address() {
        let err = static_machine(&node("os_type: rhel"), &root()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration at `test`: missing required `ip_address`"
        );
    }

    #[test]
    fn duplicate_mount_points_are_rejected() {
        let err = static_machine(
            &node(
                "ip_address: 10.0.0.4\ndisk_specs:\n  - mount_point: /a\n  - mount_point: /a\n",
            ),
            &root(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::DuplicateName { kind: "mount point", .. }));
    }

    #[test]
    fn cloud_groups_pick_their_vm_spec_entry() {
        let group = vm_group(
            "vm_1",
            &node(
                r#"
cloud: aws
vm_spec:
  GCP:
    machine_type: n1-standard-4
  AWS:
    machine_type: c4.xlarge
    zone: us-east-1a
    image: ami-12345
"#,
            ),
            &root(),
        )
        .unwrap();

        assert!(!group.is_static());
        assert_eq!(group.vm_count(), 1);
        assert_eq!(group.vm_spec().machine_type(), Some("c4.xlarge"));
        assert_eq!(group.vm_spec().zone(), Some("us-east-1a"));
        assert_eq!(
            group.vm_spec().attributes().get("image"),
            Some(&RawNode::from("ami-12345"))
        );
    }

    #[test]
    fn cloud_groups_require_a_vm_spec_entry() {
        let err = vm_group(
            "vm_1",
            &node("cloud: Azure\nvm_spec:\n  GCP:\n    machine_type: n1-standard-4\n"),
            &root(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid configuration at `test.vm_spec`: missing an entry for cloud `Azure`"
        );
    }

    #[test]
    fn static_groups_need_no_vm_spec() {
        let group = vm_group(
            "vm_1",
            &node("cloud: Static\nos_type: rhel\nvm_count: 2\n"),
            &root(),
        )
        .unwrap();

        assert!(group.is_static());
        assert!(group.selectors().is_empty());
        assert_eq!(group.vm_count(), 2);
        assert_eq!(group.os_type(), Some("rhel"));
    }

    #[test]
    fn selecting_static_machines_implies_static_placement() {
        let group = vm_group(
            "vm_1",
            &node("static_vms:\n  - ip_address: 10.0.0.4\n    disk_specs: []\n"),
            &root(),
        )
        .unwrap();

        assert!(group.is_static());
        assert_eq!(group.selectors().len(), 1);
        assert!(!group.vm_spec().requests_provisioning());
    }

    #[test]
    fn listed_static_machines_replace_an_inherited_cloud() {
        let group = vm_group(
            "vm_1",
            &node(
                r#"
cloud: GCP
vm_spec:
  GCP:
    machine_type: n1-standard-1
static_vms:
  - ip_address: 10.0.0.4
  - ip_address: 10.0.0.5
"#,
            ),
            &root(),
        )
        .unwrap();

        assert!(group.is_static());
        assert_eq!(group.vm_spec().cloud(), &Cloud::Static);
        assert_eq!(group.selectors().len(), 2);
        assert_eq!(group.vm_count(), 2);
    }

    #[test]
    fn explicit_counts_win_over_listed_machines() {
        let group = vm_group(
            "vm_1",
            &node("vm_count: 1
static_vms:
  - os_type: rhel
  - os_type: rhel
"),
            &root(),
        )
        .unwrap();

        assert_eq!(group.vm_count(), 1);
    }

    #[test]
    fn an_empty_machine_list_keeps_the_cloud() {
        let group = vm_group(
            "vm_1",
            &node("cloud: GCP
vm_spec:
  GCP: {}
static_vms: []
"),
            &root(),
        )
        .unwrap();

        assert!(!group.is_static());
        assert_eq!(group.vm_spec().cloud().name(), "GCP");
    }

    #[test]
    fn counts_are_checked() {
        let err = vm_group("vm_1", &node("cloud: Static\nvm_count: 0\n"), &root()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration at `test.vm_count`: must be at least 1"
        );

        let err = vm_group(
            "vm_1",
            &node("cloud: Static\ndisk_count: 2\ndisk_specs:\n  - mount_point: /scratch\n"),
            &root(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration at `test.disk_count`: declares 2 disk(s) but `disk_specs` \
             lists 1"
        );
    }

    #[test]
    fn fields_are_type_checked() {
        let err = vm_group("vm_1", &node("cloud: Static\nvm_count: two\n"), &root()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch at `test.vm_count`: expected integer, found string"
        );
    }

    #[test]
    fn group_names_are_validated() {
        let err = vm_group("bad name", &node("cloud: Static"), &root()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn benchmarks_keep_flags_and_options() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("mysql_service").unwrap();

        let spec = benchmark_spec(
            entry,
            &crate::merge::merge(
                entry.defaults(),
                &node("flags:\n  db_instance_cores: 16\nrun_stage: all\n"),
            )
            .unwrap(),
            &root(),
        )
        .unwrap();

        assert_eq!(spec.name(), "mysql_service");
        assert_eq!(spec.description(), Some("MySQL service benchmarks."));
        assert_eq!(spec.flag("db_instance_cores"), Some(&RawNode::Integer(16)));
        assert_eq!(spec.flag("oltp_tables_count"), Some(&RawNode::Integer(4)));
        assert_eq!(spec.options().get("run_stage"), Some(&RawNode::from("all")));
        assert_eq!(spec.vm_count(), 1);
    }

    #[test]
    fn restricted_flags_are_checked() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("mysql_service").unwrap();

        let err = benchmark_spec(
            entry,
            &crate::merge::merge(entry.defaults(), &node("flags:\n  db_instance_cores: 2\n"))
                .unwrap(),
            &root(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "invalid configuration at `test.flags.db_instance_cores`: `2` is not one of `1`, \
             `4`, `8`, `16`"
        );
    }

    #[test]
    fn flags_must_be_scalars() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("iperf").unwrap();

        let err = benchmark_spec(
            entry,
            &crate::merge::merge(
                entry.defaults(),
                &node("flags:\n  iperf_runtime_in_seconds: 60\n  extra: [1, 2]\n"),
            )
            .unwrap(),
            &root(),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "type mismatch at `test.flags.extra`: expected scalar, found sequence"
        );
    }

    #[test]
    fn benchmarks_require_groups() {
        let catalog = Catalog::builtin();
        let entry = catalog.get("iperf").unwrap();

        let err = benchmark_spec(entry, &RawNode::Null, &root()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration at `test`: missing required `vm_groups`"
        );
    }
}
