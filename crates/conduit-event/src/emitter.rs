use tokio::sync::mpsc;
use tracing::{error, info};

use crate::event::Event;

/// Receives events published by a workflow and its nodes.
///
/// Emitting must not block: no acknowledgement or backpressure is expected.
pub trait EventEmitter: Send + Sync {
  fn emit(&self, event: Event);
}

/// Discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopEmitter;

impl EventEmitter for NoopEmitter {
  fn emit(&self, _event: Event) {}
}

/// Sends events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelEmitter {
  // Unbounded: emitting never waits on the receiver.
  sender: mpsc::UnboundedSender<Event>,
}

impl ChannelEmitter {
  pub fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
    Self { sender }
  }

  /// Create an emitter along with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl EventEmitter for ChannelEmitter {
  fn emit(&self, event: Event) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}

/// Renders every event as a log line.
#[derive(Debug, Clone, Default)]
pub struct LogEmitter;

impl EventEmitter for LogEmitter {
  fn emit(&self, event: Event) {
    match &event {
      Event::WorkflowStarted { workflow }
      | Event::WorkflowPaused { workflow }
      | Event::WorkflowStopped { workflow } => {
        info!(event = event.name(), workflow = %workflow, "workflow event");
      }
      Event::Error { message } => {
        error!(event = event.name(), message = %message, "error event");
      }
      Event::Node {
        node,
        name,
        payload,
      } => {
        info!(event = %name, node = %node, payload = %payload, "node event");
      }
    }
  }
}
