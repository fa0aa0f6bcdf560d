use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::node::NodeDef;

/// A directed edge from a parent node to a child node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDef {
  pub from: String,
  pub to: String,
}

/// A complete pipeline: its nodes, the edges between them and the groups
/// they are started in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDef {
  pub name: String,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
  /// Nodes listed in the same group are started together. Nodes outside
  /// every group are started on their own.
  #[serde(default)]
  pub groups: Vec<Vec<String>>,
  /// Stop each node once all its parents or all its children are done.
  #[serde(default)]
  pub stop_when_nodes_are_done: bool,
}

impl PipelineDef {
  /// Parse and validate a pipeline from JSON.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    let def: PipelineDef = serde_json::from_str(json)?;
    def.validate()?;
    Ok(def)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let mut names = HashSet::new();
    for node in &self.nodes {
      if !names.insert(node.name.as_str()) {
        return Err(ConfigError::DuplicateNode {
          name: node.name.clone(),
        });
      }
    }

    for edge in &self.edges {
      if !names.contains(edge.from.as_str()) || !names.contains(edge.to.as_str()) {
        return Err(ConfigError::InvalidEdge {
          from: edge.from.clone(),
          to: edge.to.clone(),
        });
      }
    }

    let mut membership: HashMap<&str, usize> = HashMap::new();
    for (group, members) in self.groups.iter().enumerate() {
      for name in members {
        if !names.contains(name.as_str()) {
          return Err(ConfigError::UnknownGroupNode {
            group,
            name: name.clone(),
          });
        }
        if let Some(&first) = membership.get(name.as_str()) {
          if first != group {
            return Err(ConfigError::NodeInMultipleGroups {
              name: name.clone(),
              first,
              second: group,
            });
          }
          continue;
        }
        membership.insert(name.as_str(), group);
      }
    }

    Ok(())
  }

  /// Names of the nodes with no incoming edge, sorted.
  pub fn roots(&self) -> Vec<String> {
    let targets: HashSet<&str> = self.edges.iter().map(|e| e.to.as_str()).collect();
    self
      .nodes
      .iter()
      .map(|n| n.name.as_str())
      .filter(|name| !targets.contains(name))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .map(str::to_string)
      .collect()
  }

  pub fn node(&self, name: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.name == name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::node::NodeKind;

  fn fan_in() -> &'static str {
    r#"{
      "name": "fan-in",
      "stop_when_nodes_are_done": true,
      "nodes": [
        { "name": "right", "type": "ticker", "count": 5, "interval_ms": 50 },
        { "name": "left", "type": "ticker", "count": 3, "interval_ms": 100 },
        { "name": "sink", "type": "relay" }
      ],
      "edges": [
        { "from": "left", "to": "sink" },
        { "from": "right", "to": "sink" }
      ],
      "groups": [["left", "right"]]
    }"#
  }

  fn relay(name: &str) -> NodeDef {
    NodeDef {
      name: name.to_string(),
      label: None,
      description: None,
      kind: NodeKind::Relay,
    }
  }

  fn pipeline(nodes: &[&str]) -> PipelineDef {
    PipelineDef {
      name: "p".to_string(),
      nodes: nodes.iter().map(|n| relay(n)).collect(),
      edges: vec![],
      groups: vec![],
      stop_when_nodes_are_done: false,
    }
  }

  fn edge(from: &str, to: &str) -> EdgeDef {
    EdgeDef {
      from: from.to_string(),
      to: to.to_string(),
    }
  }

  #[test]
  fn test_parse_fan_in() {
    let def = PipelineDef::from_json(fan_in()).unwrap();
    assert_eq!(def.name, "fan-in");
    assert_eq!(def.nodes.len(), 3);
    assert_eq!(def.edges.len(), 2);
    assert_eq!(def.groups, vec![vec!["left".to_string(), "right".to_string()]]);
    assert!(def.stop_when_nodes_are_done);
    assert_eq!(def.node("sink").unwrap().kind, NodeKind::Relay);
    assert!(def.node("missing").is_none());
  }

  #[test]
  fn test_defaults_for_optional_sections() {
    let def = PipelineDef::from_json(r#"{ "name": "solo", "nodes": [{ "name": "a", "type": "relay" }] }"#)
      .unwrap();
    assert!(def.edges.is_empty());
    assert!(def.groups.is_empty());
    assert!(!def.stop_when_nodes_are_done);
  }

  #[test]
  fn test_parse_error() {
    let err = PipelineDef::from_json("{ not json").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
  }

  #[test]
  fn test_roots_are_sorted() {
    let def = PipelineDef::from_json(fan_in()).unwrap();
    assert_eq!(def.roots(), vec!["left", "right"]);
  }

  #[test]
  fn test_duplicate_node_name() {
    let def = pipeline(&["a", "b", "a"]);
    let err = def.validate().unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateNode { ref name } if name == "a"));
  }

  #[test]
  fn test_edge_to_unknown_node() {
    let mut def = pipeline(&["a"]);
    def.edges.push(edge("a", "ghost"));
    let err = def.validate().unwrap_err();
    assert_eq!(
      err.to_string(),
      "edge references unknown node: from=a, to=ghost"
    );
  }

  #[test]
  fn test_group_with_unknown_node() {
    let mut def = pipeline(&["a"]);
    def.groups.push(vec!["a".to_string(), "ghost".to_string()]);
    let err = def.validate().unwrap_err();
    assert!(matches!(err, ConfigError::UnknownGroupNode { group: 0, ref name } if name == "ghost"));
  }

  #[test]
  fn test_node_in_two_groups() {
    let mut def = pipeline(&["a", "b"]);
    def.groups.push(vec!["a".to_string()]);
    def.groups.push(vec!["b".to_string(), "a".to_string()]);
    let err = def.validate().unwrap_err();
    assert!(matches!(
      err,
      ConfigError::NodeInMultipleGroups { ref name, first: 0, second: 1 } if name == "a"
    ));
  }

  #[test]
  fn test_node_repeated_within_one_group_is_allowed() {
    let mut def = pipeline(&["a"]);
    def.groups.push(vec!["a".to_string(), "a".to_string()]);
    assert!(def.validate().is_ok());
  }

  #[test]
  fn test_cycle_has_no_roots() {
    let mut def = pipeline(&["a", "b"]);
    def.edges.push(edge("a", "b"));
    def.edges.push(edge("b", "a"));
    assert!(def.validate().is_ok());
    assert!(def.roots().is_empty());
  }
}
