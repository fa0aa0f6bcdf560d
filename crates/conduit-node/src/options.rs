use std::fmt;

use serde::{Deserialize, Serialize};

/// Options a node is started with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
  /// Stop the node once all of its children, or all of its parents, have
  /// signaled that they are done.
  #[serde(default)]
  pub stop_when_nodes_are_done: bool,
}

/// Lifecycle status of a node or workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
  #[default]
  Stopped,
  Running,
  Paused,
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Status::Stopped => "stopped",
      Status::Running => "running",
      Status::Paused => "paused",
    };
    f.write_str(s)
  }
}
