use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use conduit_event::{Event, EventEmitter};
use conduit_node::{
  AsBaseNode, BaseNode, CancellationToken, NodeMetadata, Pauser, StartOptions, Starter,
  TaskFactory,
};
use serde_json::json;
use tokio::sync::watch;
use tracing::debug;

/// Emits `count` tick events, one every `interval`, then finishes.
///
/// Pausing holds the loop at its current position; resuming picks it up
/// from there.
pub struct TickerNode {
  base: BaseNode,
  count: u64,
  interval: Duration,
  emitter: Arc<dyn EventEmitter>,
  ticks: AtomicU64,
  paused: watch::Sender<bool>,
}

impl TickerNode {
  pub fn new(
    metadata: NodeMetadata,
    count: u64,
    interval: Duration,
    emitter: Arc<dyn EventEmitter>,
  ) -> Arc<Self> {
    let (paused, _) = watch::channel(false);
    Arc::new(Self {
      base: BaseNode::new(metadata),
      count,
      interval,
      emitter,
      ticks: AtomicU64::new(0),
      paused,
    })
  }

  /// Ticks emitted by the current (or last) run.
  pub fn ticks(&self) -> u64 {
    self.ticks.load(Ordering::SeqCst)
  }

  async fn run(&self, token: CancellationToken) {
    let name = &self.base.metadata().name;
    let mut paused = self.paused.subscribe();
    self.ticks.store(0, Ordering::SeqCst);

    for tick in 1..=self.count {
      tokio::select! {
        _ = token.cancelled() => break,
        _ = tokio::time::sleep(self.interval) => {}
      }
      tokio::select! {
        _ = token.cancelled() => break,
        running = resumed(&mut paused) => if !running { break },
      }

      self.ticks.store(tick, Ordering::SeqCst);
      self.emitter.emit(Event::node(
        name.as_str(),
        "tick",
        json!({ "tick": tick, "count": self.count }),
      ));
    }

    debug!(node = %name, ticks = self.ticks(), "ticker finished");
    self.paused.send_replace(false);
  }
}

async fn resumed(paused: &mut watch::Receiver<bool>) -> bool {
  paused.wait_for(|p| !*p).await.is_ok()
}

impl AsBaseNode for TickerNode {
  fn base_node(&self) -> &BaseNode {
    &self.base
  }
}

impl Starter for TickerNode {
  fn is_stopped(&self) -> bool {
    self.base.is_stopped()
  }

  fn start(self: Arc<Self>, scope: &CancellationToken, options: &StartOptions, factory: TaskFactory) {
    let this = Arc::clone(&self);
    self
      .base
      .start(scope, options, &factory, move |_task, token| async move {
        this.run(token).await;
      });
  }

  fn stop(&self) {
    self.base.stop();
  }
}

impl Pauser for TickerNode {
  fn pause(&self) {
    if self.base.pause() {
      self.paused.send_replace(true);
    }
  }

  fn resume(&self) {
    if self.base.resume() {
      self.paused.send_replace(false);
    }
  }
}
