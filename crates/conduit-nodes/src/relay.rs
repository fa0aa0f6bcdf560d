use std::sync::Arc;

use conduit_node::{
  AsBaseNode, BaseNode, CancellationToken, NodeMetadata, Pauser, StartOptions, Starter,
  TaskFactory,
};

/// A stage with no work of its own. It stays alive until its scope is
/// cancelled, which makes it a fan-in point when started with
/// `stop_when_nodes_are_done`.
pub struct RelayNode {
  base: BaseNode,
}

impl RelayNode {
  pub fn new(metadata: NodeMetadata) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(metadata),
    })
  }
}

impl AsBaseNode for RelayNode {
  fn base_node(&self) -> &BaseNode {
    &self.base
  }
}

impl Starter for RelayNode {
  fn is_stopped(&self) -> bool {
    self.base.is_stopped()
  }

  fn start(self: Arc<Self>, scope: &CancellationToken, options: &StartOptions, factory: TaskFactory) {
    self
      .base
      .start(scope, options, &factory, |_task, token| async move {
        token.cancelled().await;
      });
  }

  fn stop(&self) {
    self.base.stop();
  }
}

impl Pauser for RelayNode {
  fn pause(&self) {
    self.base.pause();
  }

  fn resume(&self) {
    self.base.resume();
  }
}
