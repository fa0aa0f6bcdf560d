use std::error::Error;

use serde::Serialize;

/// Events published during a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
  /// The workflow started, or continued after a pause.
  WorkflowStarted { workflow: String },

  /// The workflow was paused.
  WorkflowPaused { workflow: String },

  /// Every node of the workflow finished and resources were closed.
  WorkflowStopped { workflow: String },

  /// Something failed. The message carries the full error chain.
  Error { message: String },

  /// A free-form event published by a concrete node.
  Node {
    node: String,
    name: String,
    payload: serde_json::Value,
  },
}

impl Event {
  /// Stable name of the event kind.
  pub fn name(&self) -> &'static str {
    match self {
      Event::WorkflowStarted { .. } => "workflow.started",
      Event::WorkflowPaused { .. } => "workflow.paused",
      Event::WorkflowStopped { .. } => "workflow.stopped",
      Event::Error { .. } => "error",
      Event::Node { .. } => "node",
    }
  }

  /// Build an error event from an error and its sources.
  pub fn error(err: &(dyn Error + 'static)) -> Self {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
      message.push_str(": ");
      message.push_str(&cause.to_string());
      source = cause.source();
    }
    Event::Error { message }
  }

  /// Build a node event.
  pub fn node(
    node: impl Into<String>,
    name: impl Into<String>,
    payload: serde_json::Value,
  ) -> Self {
    Event::Node {
      node: node.into(),
      name: name.into(),
      payload,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, thiserror::Error)]
  #[error("closing workflow w1 failed")]
  struct Outer {
    #[source]
    source: Inner,
  }

  #[derive(Debug, thiserror::Error)]
  #[error("file handle leaked")]
  struct Inner;

  #[test]
  fn test_error_event_joins_source_chain() {
    let err = Outer { source: Inner };
    assert_eq!(
      Event::error(&err),
      Event::Error {
        message: "closing workflow w1 failed: file handle leaked".to_string()
      }
    );
  }

  #[test]
  fn test_names() {
    let started = Event::WorkflowStarted {
      workflow: "w".into(),
    };
    assert_eq!(started.name(), "workflow.started");
    assert_eq!(
      Event::node("a", "tick", serde_json::json!(1)).name(),
      "node"
    );
  }

  #[test]
  fn test_serializes_with_event_tag() {
    let event = Event::WorkflowPaused {
      workflow: "w".into(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(
      json,
      serde_json::json!({ "event": "workflow_paused", "workflow": "w" })
    );
  }
}
