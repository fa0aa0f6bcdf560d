use serde::{Deserialize, Serialize};

/// Identity of a node.
///
/// `name` is the key used for graph edges and the workflow registry and must
/// be unique among the nodes reachable from one workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeMetadata {
  pub name: String,
  #[serde(default)]
  pub label: String,
  #[serde(default)]
  pub description: String,
}

impl NodeMetadata {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Default::default()
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }
}
