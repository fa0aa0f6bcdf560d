//! Conduit Nodes
//!
//! Ready-made stages that can be wired into a workflow:
//!
//! - [`TickerNode`] emits a fixed number of tick events and finishes.
//! - [`RelayNode`] does nothing until its scope is cancelled. With
//!   `stop_when_nodes_are_done` it acts as a fan-in point that shuts down
//!   once every parent has finished.
//!
//! [`build`] turns a [`NodeDef`] from a pipeline file into one of these.

mod relay;
mod ticker;

use std::sync::Arc;
use std::time::Duration;

use conduit_config::{NodeDef, NodeKind};
use conduit_event::EventEmitter;
use conduit_node::{Node, NodeMetadata};

pub use relay::RelayNode;
pub use ticker::TickerNode;

/// Build the node described by `def`.
pub fn build(def: &NodeDef, emitter: Arc<dyn EventEmitter>) -> Arc<dyn Node> {
  let mut metadata = NodeMetadata::new(def.name.as_str());
  if let Some(label) = &def.label {
    metadata = metadata.with_label(label.as_str());
  }
  if let Some(description) = &def.description {
    metadata = metadata.with_description(description.as_str());
  }

  match def.kind {
    NodeKind::Ticker { count, interval_ms } => {
      TickerNode::new(metadata, count, Duration::from_millis(interval_ms), emitter)
    }
    NodeKind::Relay => RelayNode::new(metadata),
  }
}
