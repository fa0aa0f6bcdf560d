use thiserror::Error;

/// Errors raised while loading or validating a pipeline definition.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to parse pipeline: {0}")]
  Parse(#[from] serde_json::Error),

  /// Two nodes share a name.
  #[error("duplicate node name: {name}")]
  DuplicateNode { name: String },

  /// An edge references a node that is not defined.
  #[error("edge references unknown node: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  /// A start group references a node that is not defined.
  #[error("group {group} references unknown node '{name}'")]
  UnknownGroupNode { group: usize, name: String },

  /// A node is listed in more than one start group.
  #[error("node '{name}' is listed in groups {first} and {second}")]
  NodeInMultipleGroups {
    name: String,
    first: usize,
    second: usize,
  },
}
