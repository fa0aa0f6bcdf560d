//! Nodes for exercising the lifecycle in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use conduit_task::TaskFactory;
use tokio_util::sync::CancellationToken;

use crate::base::{AsBaseNode, BaseNode};
use crate::metadata::NodeMetadata;
use crate::options::{StartOptions, Status};
use crate::traits::{Node, NodeDescriptor, Pauser, Starter};

#[derive(Clone, Copy)]
enum Behavior {
  Immediate,
  Blocking,
  Panicking,
}

pub(crate) struct TestNode {
  pub base: BaseNode,
  pub runs: AtomicUsize,
  behavior: Behavior,
}

impl TestNode {
  fn new(name: &str, behavior: Behavior) -> Arc<Self> {
    Arc::new(Self {
      base: BaseNode::new(NodeMetadata::new(name)),
      runs: AtomicUsize::new(0),
      behavior,
    })
  }

  /// Returns as soon as it runs.
  pub fn immediate(name: &str) -> Arc<Self> {
    Self::new(name, Behavior::Immediate)
  }

  /// Runs until its scope is cancelled.
  pub fn blocking(name: &str) -> Arc<Self> {
    Self::new(name, Behavior::Blocking)
  }

  pub fn panicking(name: &str) -> Arc<Self> {
    Self::new(name, Behavior::Panicking)
  }

  pub fn start_with(
    self: &Arc<Self>,
    scope: &CancellationToken,
    options: &StartOptions,
    factory: TaskFactory,
  ) {
    Arc::clone(self).start(scope, options, factory);
  }

  pub async fn wait_runs(&self, runs: usize) {
    tokio::time::timeout(Duration::from_secs(1), async {
      while self.runs.load(Ordering::SeqCst) < runs {
        tokio::time::sleep(Duration::from_millis(2)).await;
      }
    })
    .await
    .expect("exec function did not run");
  }

  pub async fn wait_stopped(&self) {
    tokio::time::timeout(Duration::from_secs(1), async {
      while !(self.base.is_stopped() && self.base.status() == Status::Stopped) {
        tokio::time::sleep(Duration::from_millis(2)).await;
      }
    })
    .await
    .expect("node did not stop");
  }
}

impl AsBaseNode for TestNode {
  fn base_node(&self) -> &BaseNode {
    &self.base
  }
}

impl Starter for TestNode {
  fn is_stopped(&self) -> bool {
    self.base.is_stopped()
  }

  fn start(self: Arc<Self>, scope: &CancellationToken, options: &StartOptions, factory: TaskFactory) {
    let this = Arc::clone(&self);
    self
      .base
      .start(scope, options, &factory, move |_task, token| async move {
        this.runs.fetch_add(1, Ordering::SeqCst);
        match this.behavior {
          Behavior::Immediate => {}
          Behavior::Blocking => token.cancelled().await,
          Behavior::Panicking => panic!("exec failed"),
        }
      });
  }

  fn stop(&self) {
    self.base.stop();
  }
}

impl Pauser for TestNode {
  fn pause(&self) {
    self.base.pause();
  }

  fn resume(&self) {
    self.base.resume();
  }
}

pub(crate) fn node(n: &Arc<TestNode>) -> Arc<dyn Node> {
  Arc::clone(n) as Arc<dyn Node>
}

pub(crate) fn names(nodes: &[Arc<dyn Node>]) -> Vec<String> {
  nodes.iter().map(|n| n.metadata().name.clone()).collect()
}
