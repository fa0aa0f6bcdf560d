//! Workflow error types.

use crate::closer::CloseError;

/// Errors surfaced by the workflow coordinator.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
  /// No node with this name was indexed.
  #[error("node '{name}' not found")]
  NodeNotFound { name: String },

  /// Releasing the workflow's resources failed.
  #[error("closing workflow '{workflow}' failed")]
  Close {
    workflow: String,
    #[source]
    source: CloseError,
  },
}
