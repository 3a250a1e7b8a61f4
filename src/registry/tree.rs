// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Descriptor document parsing
//!
//! Parsing happens in two passes. [`parse_document`] descends the YAML value
//! and produces a typed [`DescriptorNode`] tree, recognising step leaves by
//! the reserved `cmd` key. [`flatten`] then walks that tree and assigns each
//! leaf its namespace. Nesting depth is unconstrained, so authors can group
//! steps by mode, stage, or anything else.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};

/// Reserved key marking a mapping as a step leaf
pub const COMMAND_KEY: &str = "cmd";

/// Accepted alias for [`COMMAND_KEY`]
pub const COMMAND_ALIAS: &str = "command";

/// Artifact list, written either as one string or as a list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactList {
    /// `in: netlist.v`
    Single(String),
    /// `in: [netlist.v, sdc.tcl]`
    Multiple(Vec<String>),
}

impl ArtifactList {
    /// Artifact ids in declaration order
    pub fn items(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// A step leaf as written in the descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    /// Opaque command reference; any scalar is accepted
    #[serde(alias = "command", deserialize_with = "scalar_command")]
    pub cmd: String,

    /// Consumed artifacts
    #[serde(default, rename = "in", alias = "inputs")]
    pub inputs: Option<ArtifactList>,

    /// Produced artifacts
    #[serde(default, rename = "out", alias = "outputs")]
    pub outputs: Option<ArtifactList>,
}

fn scalar_command<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Tagged(tagged) => scalar_command(tagged.value).map_err(D::Error::custom),
        _ => Err(D::Error::custom("cmd must be a string, number or boolean")),
    }
}

/// Typed descriptor tree
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorNode {
    /// Step leaf
    Step(StepSpec),
    /// Mapping of named children, in document order
    Group(Vec<(String, DescriptorNode)>),
    /// Sequence of children
    List(Vec<DescriptorNode>),
    /// Anything else (strings, numbers, null); carries no steps
    Scalar,
}

/// A step leaf with its resolved namespace
#[derive(Debug, Clone, PartialEq)]
pub struct FlatStep {
    pub namespace: Option<String>,
    pub name: String,
    pub spec: StepSpec,
}

/// Parse a YAML document into a descriptor tree
pub fn parse_document(value: &Value) -> Result<DescriptorNode, String> {
    parse_node(value, "")
}

fn parse_node(value: &Value, path: &str) -> Result<DescriptorNode, String> {
    match value {
        Value::Mapping(map) => {
            let mut children = Vec::with_capacity(map.len());
            for (key, child) in map {
                let key = key_to_string(key, path)?;
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let node = match child {
                    Value::Mapping(inner) if is_step_leaf(inner) => {
                        DescriptorNode::Step(parse_step(child, &child_path)?)
                    }
                    _ => parse_node(child, &child_path)?,
                };
                children.push((key, node));
            }
            Ok(DescriptorNode::Group(children))
        }
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_node(item, &format!("{}[{}]", path, i)))
            .collect::<Result<Vec<_>, _>>()
            .map(DescriptorNode::List),
        Value::Tagged(tagged) => parse_node(&tagged.value, path),
        _ => Ok(DescriptorNode::Scalar),
    }
}

fn is_step_leaf(map: &Mapping) -> bool {
    map.contains_key(COMMAND_KEY) || map.contains_key(COMMAND_ALIAS)
}

fn parse_step(value: &Value, path: &str) -> Result<StepSpec, String> {
    serde_yaml::from_value(value.clone()).map_err(|e| format!("step '{}': {}", path, e))
}

fn key_to_string(key: &Value, path: &str) -> Result<String, String> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(format!("unsupported mapping key under '{}'", path)),
    }
}

/// Flatten a descriptor tree into step leaves.
///
/// Top-level keys name the namespace (flow) of everything below them. Leaves
/// sitting directly at the top level use `default_namespace`.
pub fn flatten(root: &DescriptorNode, default_namespace: Option<&str>) -> Vec<FlatStep> {
    let mut out = Vec::new();
    collect(root, default_namespace, true, &mut out);
    out
}

fn collect(node: &DescriptorNode, namespace: Option<&str>, top: bool, out: &mut Vec<FlatStep>) {
    match node {
        DescriptorNode::Group(children) => {
            for (key, child) in children {
                match child {
                    DescriptorNode::Step(spec) => out.push(FlatStep {
                        namespace: namespace.map(String::from),
                        name: key.clone(),
                        spec: spec.clone(),
                    }),
                    _ if top => collect(child, Some(key), false, out),
                    _ => collect(child, namespace, false, out),
                }
            }
        }
        DescriptorNode::List(items) => {
            for item in items {
                collect(item, namespace, top, out);
            }
        }
        DescriptorNode::Step(_) | DescriptorNode::Scalar => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> DescriptorNode {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        parse_document(&value).unwrap()
    }

    #[test]
    fn test_nested_flow_layout() {
        let yaml = r#"
pv_calibre:
  dependency:
    FP_MODE:
      - drc:
          in: [postroute.pass]
          out: [drc.pass]
          cmd: calibre_drc.tcl
      - lvs:
          in: postroute.pass
          out: lvs.pass
          cmd: calibre_lvs.tcl
"#;
        let steps = flatten(&parse(yaml), None);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].namespace.as_deref(), Some("pv_calibre"));
        assert_eq!(steps[0].name, "drc");
        assert_eq!(steps[0].spec.cmd, "calibre_drc.tcl");
        assert_eq!(
            steps[1].spec.inputs,
            Some(ArtifactList::Single("postroute.pass".into()))
        );
    }

    #[test]
    fn test_depth_is_free() {
        let yaml = r#"
flow:
  a:
    b:
      c:
        d:
          deep_step:
            cmd: run.sh
  shallow:
    command: other.sh
    inputs: [x]
"#;
        let steps = flatten(&parse(yaml), None);
        let names: Vec<_> = steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["deep_step", "shallow"]);
        assert!(steps.iter().all(|s| s.namespace.as_deref() == Some("flow")));
        assert_eq!(steps[1].spec.cmd, "other.sh");
    }

    #[test]
    fn test_top_level_step_uses_default_namespace() {
        let yaml = r#"
lonely:
  cmd: lonely.sh
"#;
        let steps = flatten(&parse(yaml), Some("misc"));
        assert_eq!(steps[0].namespace.as_deref(), Some("misc"));

        let steps = flatten(&parse(yaml), None);
        assert_eq!(steps[0].namespace, None);
    }

    #[test]
    fn test_mapping_without_cmd_is_not_a_step() {
        let yaml = r#"
flow:
  settings:
    in: [a]
    out: [b]
"#;
        assert!(flatten(&parse(yaml), None).is_empty());
    }

    #[test]
    fn test_malformed_leaf_is_an_error() {
        let yaml = r#"
flow:
  broken:
    cmd: run.sh
    in:
      nested: mapping
"#;
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        let err = parse_document(&value).unwrap_err();
        assert!(err.contains("flow.broken"));
    }

    #[test]
    fn test_numeric_command_is_kept_as_text() {
        let yaml = r#"
flow:
  job:
    in: [a]
    cmd: 42
  flag:
    cmd: true
"#;
        let steps = flatten(&parse(yaml), None);
        assert_eq!(steps[0].spec.cmd, "42");
        assert_eq!(steps[1].spec.cmd, "true");
    }

    #[test]
    fn test_empty_artifact_lists() {
        let yaml = r#"
flow:
  s:
    in:
    out: []
    cmd: s.sh
"#;
        let steps = flatten(&parse(yaml), None);
        assert_eq!(steps[0].spec.inputs, None);
        assert_eq!(steps[0].spec.outputs, Some(ArtifactList::Multiple(vec![])));
    }
}
