//! A bridge from YAML documents to [`RawNode`] trees.
//!
//! References survive into the raw tree rather than being expanded by the YAML
//! parser, so that they can be resolved (and reported) with paths. Native YAML
//! anchors become [`RawNode::Anchor`] and native aliases become
//! [`RawNode::Alias`]. An alias may come before its anchor:
//!
//! ```yaml
//! static_vms:
//!   - *rhel_box
//! rhel_box: &rhel_box
//!   ip_address: 10.0.0.4
//!   os_type: rhel
//! ```
//!
//! The `!ref` tag is an explicit alias (`!ref rhel_box`). When loading a whole
//! document with [`parse_document()`], every top-level key other than the
//! [reserved keys](RESERVED_KEYS) is also registered as an anchor of the same
//! name.

use std::borrow::Cow;

use serde_yaml::Value;
use thiserror::Error;
use yaml_rust2::scanner::Scanner;
use yaml_rust2::scanner::Token;
use yaml_rust2::scanner::TokenType;

use crate::node::KeyPath;
use crate::node::Mapping;
use crate::node::RawNode;

/// The tag (sans the leading `!`) that marks a reference to a named
/// definition.
pub const REF_TAG: &str = "ref";

/// The tag (sans the leading `!`) under which native anchors are carried
/// through the YAML parser, as in `!anchor/rhel_box`.
const ANCHOR_TAG: &str = "anchor/";

/// Top-level keys that are never registered as anchors.
pub const RESERVED_KEYS: [&str; 2] = ["static_vms", "benchmarks"];

/// An error encountered while converting YAML into a [`RawNode`].
#[derive(Error, Debug)]
pub enum Error {
    /// The text was not valid YAML.
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Two keys of the same mapping rendered to the same string.
    #[error("duplicate key `{key}` at `{path}`")]
    DuplicateKey {
        /// The duplicated key.
        key: String,

        /// The path of the mapping containing the key.
        path: KeyPath,
    },

    /// A mapping key was not a scalar.
    #[error("mapping keys must be scalars at `{path}`")]
    UnsupportedKey {
        /// The path of the mapping containing the key.
        path: KeyPath,
    },

    /// A tag other than `!ref` was used.
    #[error("unsupported tag `{tag}` at `{path}`")]
    UnsupportedTag {
        /// The tag.
        tag: String,

        /// The path of the tagged value.
        path: KeyPath,
    },

    /// A native anchor or alias has a name that cannot be carried through
    /// the parser.
    #[error("invalid reference name `{name}` on line {line}")]
    InvalidName {
        /// The name.
        name: String,

        /// The (one-based) line of the anchor or alias.
        line: usize,
    },

    /// A native anchor was combined with a tag on the same node.
    #[error("anchor `{name}` cannot be combined with a tag on line {line}")]
    TaggedAnchor {
        /// The name of the anchor.
        name: String,

        /// The (one-based) line of the anchor.
        line: usize,
    },

    /// A native anchor was attached to a mapping key.
    #[error("anchor `{name}` is attached to a mapping key at `{path}`")]
    AnchoredKey {
        /// The name of the anchor.
        name: String,

        /// The path of the mapping containing the key.
        path: KeyPath,
    },

    /// A `!ref` tag was applied to something other than a string.
    #[error("`!ref` must be applied to a reference name at `{path}`")]
    InvalidReference {
        /// The path of the tagged value.
        path: KeyPath,
    },
}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Parses YAML text into a [`RawNode`].
///
/// Native anchors and aliases are kept, but top-level keys are not registered
/// as anchors.
pub fn parse(text: &str) -> Result<RawNode> {
    let text = tag_references(text)?;
    let value = serde_yaml::from_str::<Value>(&text)?;
    convert(value, &KeyPath::root())
}

/// Parses a whole configuration document.
///
/// Each top-level entry (except the [reserved keys](RESERVED_KEYS)) is wrapped
/// in an anchor named after its key so that it may be referred to with `!ref`.
pub fn parse_document(text: &str) -> Result<RawNode> {
    Ok(match parse(text)? {
        RawNode::Mapping(entries) => RawNode::Mapping(
            entries
                .into_iter()
                .map(|(key, node)| match node {
                    node if RESERVED_KEYS.contains(&key.as_str()) => (key, node),
                    // NOTE: `key: &key ...` is already anchored under its own
                    // name.
                    RawNode::Anchor { ref name, .. } if *name == key => (key, node),
                    node => {
                        let anchored = RawNode::anchor(key.clone(), node);
                        (key, anchored)
                    }
                })
                .collect(),
        ),
        other => other,
    })
}

/// An edit replacing a native anchor or alias with a tag.
#[derive(Debug)]
struct Edit {
    /// The (one-based) line of the sigil.
    line: usize,

    /// The (zero-based) column, in characters, of the sigil.
    col: usize,

    /// The sigil (`&` or `*`).
    sigil: char,

    /// The name following the sigil.
    name: String,
}

impl Edit {
    /// Gets the text replacing the anchor or alias.
    fn replacement(&self) -> String {
        match self.sigil {
            '&' => format!("!{ANCHOR_TAG}{}", self.name),
            _ => format!("!{REF_TAG} '{}'", self.name),
        }
    }
}

/// Whether or not `name` can be written inside a tag (and a quoted scalar).
fn is_taggable(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

/// Rewrites native anchors (`&name`) and aliases (`*name`) as tags so that
/// they survive the YAML parser.
///
/// Text the scanner rejects is returned unchanged so that the parser reports
/// the error.
fn tag_references(text: &str) -> Result<Cow<'_, str>> {
    let mut scanner = Scanner::new(text.chars());
    let mut edits = Vec::new();
    let mut previous: Option<TokenType> = None;

    for Token(mark, token) in scanner.by_ref() {
        let edit = match (&previous, &token) {
            (Some(TokenType::Tag(..)), TokenType::Anchor(name))
            | (Some(TokenType::Anchor(name)), TokenType::Tag(..)) => {
                return Err(Error::TaggedAnchor {
                    name: name.clone(),
                    line: mark.line(),
                });
            }
            (_, TokenType::Anchor(name)) => Some(('&', name)),
            (_, TokenType::Alias(name)) => Some(('*', name)),
            _ => None,
        };

        if let Some((sigil, name)) = edit {
            if !is_taggable(name) {
                return Err(Error::InvalidName {
                    name: name.clone(),
                    line: mark.line(),
                });
            }

            edits.push(Edit {
                line: mark.line(),
                col: mark.col(),
                sigil,
                name: name.clone(),
            });
        }

        previous = Some(token);
    }

    if edits.is_empty() || scanner.get_error().is_some() {
        return Ok(Cow::Borrowed(text));
    }

    let starts = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect::<Vec<_>>();

    let mut located = edits
        .iter()
        .filter_map(|edit| {
            let start = *starts.get(edit.line.checked_sub(1)?)?;
            let offset = text[start..]
                .char_indices()
                .nth(edit.col)
                .map(|(i, _)| start + i)?;

            text[offset..]
                .starts_with(edit.sigil)
                .then_some((offset, edit))
        })
        .collect::<Vec<_>>();

    // Splice from the back so earlier offsets stay valid.
    located.sort_by(|(a, _), (b, _)| b.cmp(a));

    let mut rewritten = text.to_string();
    for (offset, edit) in located {
        // The sigil and the (ASCII) name.
        let end = offset + 1 + edit.name.len();
        rewritten.replace_range(offset..end, &edit.replacement());
    }

    Ok(Cow::Owned(rewritten))
}

impl TryFrom<Value> for RawNode {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        convert(value, &KeyPath::root())
    }
}

/// Converts a YAML value found at `path`.
fn convert(value: Value, path: &KeyPath) -> Result<RawNode> {
    match value {
        Value::Null => Ok(RawNode::Null),
        Value::Bool(value) => Ok(RawNode::Bool(value)),
        Value::Number(number) => Ok(match number.as_i64() {
            Some(value) => RawNode::Integer(value),
            // NOTE: unsigned values beyond `i64::MAX` and true floats both land
            // here.
            None => RawNode::Float(number.as_f64().unwrap_or(f64::NAN)),
        }),
        Value::String(value) => Ok(RawNode::String(value)),
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| convert(item, &path.index(i)))
            .collect::<Result<Vec<_>>>()
            .map(RawNode::Sequence),
        Value::Mapping(entries) => {
            let mut mapping = Mapping::with_capacity(entries.len());

            for (key, value) in entries {
                let key = render_key(key, path)?;

                if mapping.contains_key(&key) {
                    return Err(Error::DuplicateKey {
                        key,
                        path: path.clone(),
                    });
                }

                let value = convert(value, &path.key(key.as_str()))?;
                mapping.insert(key, value);
            }

            Ok(RawNode::Mapping(mapping))
        }
        Value::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let bare = tag.trim_start_matches('!');

            if let Some(name) = bare.strip_prefix(ANCHOR_TAG) {
                return Ok(RawNode::anchor(name, convert(tagged.value, path)?));
            }

            if bare != REF_TAG {
                return Err(Error::UnsupportedTag {
                    tag,
                    path: path.clone(),
                });
            }

            match tagged.value {
                Value::String(name) => Ok(RawNode::Alias(name)),
                _ => Err(Error::InvalidReference { path: path.clone() }),
            }
        }
    }
}

/// Renders a scalar mapping key as a string.
fn render_key(key: Value, path: &KeyPath) -> Result<String> {
    match key {
        Value::String(key) => Ok(key),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(value) => Ok(value.to_string()),
        Value::Null => Ok(String::from("null")),
        Value::Tagged(tagged) => match tagged.tag.to_string().trim_start_matches('!') {
            tag if tag.starts_with(ANCHOR_TAG) => Err(Error::AnchoredKey {
                name: tag[ANCHOR_TAG.len()..].to_string(),
                path: path.clone(),
            }),
            _ => Err(Error::UnsupportedKey { path: path.clone() }),
        },
        _ => Err(Error::UnsupportedKey { path: path.clone() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_anchors_are_kept() {
        let node = parse(
            r#"
shape: &shape
  machine_type: n1-standard-4
a: *shape
b: [*shape, {zone: *zone}]
zone: &zone us-central1-a
"#,
        )
        .unwrap();

        assert!(node.has_references());
        assert!(matches!(
            node.get("shape"),
            Some(RawNode::Anchor { name, node })
                if name == "shape" && node.get("machine_type").is_some()
        ));
        assert_eq!(node.get("a"), Some(&RawNode::alias("shape")));
        assert_eq!(
            node.get("b").unwrap().as_sequence().unwrap()[0],
            RawNode::alias("shape")
        );
        assert_eq!(
            node.get("zone"),
            Some(&RawNode::anchor("zone", RawNode::String(String::from("us-central1-a"))))
        );
    }

    #[test]
    fn sigils_inside_scalars_are_untouched() {
        let node = parse("note: 'a &b *c'\nother: \"*d\"\n").unwrap();
        assert_eq!(node.get("note").unwrap().as_str(), Some("a &b *c"));
        assert_eq!(node.get("other").unwrap().as_str(), Some("*d"));
        assert!(!node.has_references());
    }

    #[test]
    fn numeric_anchor_names_stay_names() {
        let node = parse("a: &1 x\nb: *1\n").unwrap();
        assert_eq!(node.get("b"), Some(&RawNode::alias("1")));
    }

    #[test]
    fn anchors_cannot_carry_tags() {
        let err = parse("a: &x !!str 1\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "anchor `x` cannot be combined with a tag on line 1"
        );
    }

    #[test]
    fn anchored_keys_are_rejected() {
        let err = parse("vms:\n  - &box ip_address: 10.0.0.1\n").unwrap_err();
        assert!(matches!(err, Error::AnchoredKey { ref name, .. } if name == "box"));
    }

    #[test]
    fn self_named_top_level_anchors_are_not_wrapped_twice() {
        let node = parse_document("box: &box\n  ip_address: 10.0.0.1\n").unwrap();

        match node.get("box") {
            Some(RawNode::Anchor { name, node }) => {
                assert_eq!(name, "box");
                assert!(matches!(**node, RawNode::Mapping(_)));
            }
            node => panic!("unexpected node: {node:?}"),
        }
    }

    #[test]
    fn ref_tags_become_aliases() {
        let node = parse("vm: !ref rhel_box").unwrap();
        assert_eq!(node.get("vm"), Some(&RawNode::alias("rhel_box")));
    }

    #[test]
    fn top_level_entries_become_anchors() {
        let node = parse_document(
            r#"
rhel_box:
  ip_address: 10.0.0.4
static_vms: []
benchmarks: []
"#,
        )
        .unwrap();

        assert!(matches!(
            node.get("rhel_box"),
            Some(RawNode::Anchor { name, .. }) if name == "rhel_box"
        ));
        assert!(matches!(node.get("static_vms"), Some(RawNode::Sequence(_))));
        assert!(matches!(node.get("benchmarks"), Some(RawNode::Sequence(_))));
    }

    #[test]
    fn colliding_keys_are_rejected() {
        let err = parse("groups:\n  1: a\n  '1': b\n").unwrap_err();
        assert_eq!(err.to_string(), "duplicate key `1` at `groups`");
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let err = parse("vm: !include other.yaml").unwrap_err();
        assert!(matches!(err, Error::UnsupportedTag { .. }));
    }

    #[test]
    fn references_must_be_named_with_strings() {
        let err = parse("vm: !ref [a, b]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "`!ref` must be applied to a reference name at `vm`"
        );
    }
}
