//! Deep merging of override trees onto default trees.
//!
//! The rules are intentionally simple:
//!
//! * A null override keeps the default unmodified (at any depth).
//! * A null default is replaced by the override.
//! * Scalars replace scalars.
//! * Mappings merge key by key: keys only in the default are kept, keys only in
//!   the override are appended, and shared keys merge recursively.
//! * Sequences replace sequences wholesale. A partial override of a list must
//!   re-specify the full list.
//!
//! Any other combination (e.g., a scalar overriding a mapping) is a
//! [type mismatch](crate::Error::TypeMismatch).

use flotilla_config::KeyPath;
use flotilla_config::RawNode;

use crate::Error;
use crate::Result;

/// Merges `over` onto `default`.
pub fn merge(default: &RawNode, over: &RawNode) -> Result<RawNode> {
    merge_at(default, over, &KeyPath::root())
}

/// Merges `over` onto `default`, reporting errors relative to `path`.
pub fn merge_at(default: &RawNode, over: &RawNode, path: &KeyPath) -> Result<RawNode> {
    match (default, over) {
        (_, RawNode::Null) => Ok(default.clone()),
        (RawNode::Null, _) => Ok(over.clone()),
        (RawNode::Mapping(defaults), RawNode::Mapping(overrides)) => {
            let mut merged = defaults.clone();

            for (key, value) in overrides {
                let value = match defaults.get(key) {
                    Some(default) => merge_at(default, value, &path.key(key.as_str()))?,
                    None => value.clone(),
                };

                // NOTE: inserting an existing key keeps its original position,
                // so the default's key order is preserved.
                merged.insert(key.clone(), value);
            }

            Ok(RawNode::Mapping(merged))
        }
        (RawNode::Sequence(_), RawNode::Sequence(_)) => Ok(over.clone()),
        (default, over) if default.is_scalar() && over.is_scalar() => Ok(over.clone()),
        (default, over) => Err(Error::mismatch(path, default.kind(), over.kind())),
    }
}

#[cfg(test)]
mod tests {
    use flotilla_config::node::yaml;

    use super::*;

    fn node(text: &str) -> RawNode {
        yaml::parse(text).unwrap()
    }

    fn default_spec() -> RawNode {
        node(
            r#"
vm_groups:
  default:
    cloud: GCP
    vm_spec:
      GCP:
        machine_type: n1-standard-4
        zone: us-central1-a
    disk_specs:
      - mount_point: /scratch
        disk_size: 100
flags:
  runtime: 60
"#,
        )
    }

    #[test]
    fn null_override_is_identity() {
        let default = default_spec();
        assert_eq!(merge(&default, &RawNode::Null).unwrap(), default);
    }

    #[test]
    fn empty_mapping_is_not_null() {
        let default = default_spec();
        let merged = merge(&default, &node("{}")).unwrap();
        assert_eq!(merged, default);

        let merged = merge(&RawNode::Null, &node("{}")).unwrap();
        assert_eq!(merged, node("{}"));
    }

    #[test]
    fn overrides_merge_key_by_key() {
        let merged = merge(
            &default_spec(),
            &node(
                r#"
vm_groups:
  default:
    vm_spec:
      GCP:
        machine_type: n1-standard-8
flags:
  threads: 4
"#,
            ),
        )
        .unwrap();

        let group = merged.get("vm_groups").unwrap().get("default").unwrap();
        assert_eq!(group.get("cloud").unwrap().as_str(), Some("GCP"));

        let gcp = group.get("vm_spec").unwrap().get("GCP").unwrap();
        assert_eq!(gcp.get("machine_type").unwrap().as_str(), Some("n1-standard-8"));
        assert_eq!(gcp.get("zone").unwrap().as_str(), Some("us-central1-a"));

        let flags = merged.get("flags").unwrap().as_mapping().unwrap();
        assert_eq!(flags.keys().collect::<Vec<_>>(), ["runtime", "threads"]);
    }

    #[test]
    fn sequences_are_replaced_wholesale() {
        let merged = merge(
            &default_spec(),
            &node("vm_groups:\n  default:\n    disk_specs:\n      - mount_point: /data\n"),
        )
        .unwrap();

        let disks = merged
            .get("vm_groups")
            .and_then(|node| node.get("default"))
            .and_then(|node| node.get("disk_specs"))
            .and_then(RawNode::as_sequence)
            .unwrap();

        assert_eq!(disks, [node("mount_point: /data")]);
    }

    #[test]
    fn nested_nulls_keep_the_default() {
        let merged = merge(&default_spec(), &node("flags:\n  runtime: null\n")).unwrap();
        assert_eq!(merged, default_spec());
    }

    #[test]
    fn merging_is_idempotent() {
        let default = default_spec();
        let over = node(
            r#"
vm_groups:
  default:
    cloud: AWS
    vm_spec:
      AWS:
        machine_type: c4.xlarge
  extra:
    cloud: Static
flags:
  runtime: null
  threads: 2
"#,
        );

        let once = merge(&default, &over).unwrap();
        let twice = merge(&once, &over).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn shape_conflicts_report_the_dotted_path() {
        let err = merge(
            &default_spec(),
            &node("vm_groups:\n  default:\n    vm_spec: n1-standard-8\n"),
        )
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "type mismatch at `vm_groups.default.vm_spec`: expected mapping, found string"
        );

        let err = merge(&default_spec(), &node("vm_groups:\n  default:\n    cloud: [GCP]\n"))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch at `vm_groups.default.cloud`: expected string, found sequence"
        );
    }
}
