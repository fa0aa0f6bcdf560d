//! Reusable node lifecycle.
//!
//! [`BaseNode`] owns a node's edges, its completion bookkeeping, and its
//! execution scope. Every started node runs its exec function on its own
//! tokio task; when that function returns the node stops itself, marks its
//! tracked task done, then tells every child and every parent that it is
//! done.

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use conduit_task::{Task, TaskFactory};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::metadata::NodeMetadata;
use crate::options::{StartOptions, Status};
use crate::traits::{Node, NodeChild, NodeDescriptor, NodeParent};

#[derive(Default)]
struct NodeState {
  children: BTreeMap<String, Arc<dyn Node>>,
  children_done: HashSet<String>,
  parents: BTreeMap<String, Weak<dyn Node>>,
  parents_done: HashSet<String>,
  token: Option<CancellationToken>,
  options: StartOptions,
  started: bool,
  stopped: bool,
  status: Status,
  /// Bumped on every start so a finishing run never stops its successor.
  generation: u64,
}

impl NodeState {
  fn all_children_done(&self) -> bool {
    !self.children.is_empty()
      && self
        .children
        .keys()
        .all(|name| self.children_done.contains(name))
  }

  /// Parents that were dropped can never report, so they are forgotten.
  fn all_parents_done(&mut self) -> bool {
    self.parents.retain(|_, parent| parent.strong_count() > 0);
    let parents = &self.parents;
    self.parents_done.retain(|name| parents.contains_key(name));
    !self.parents.is_empty()
      && self
        .parents
        .keys()
        .all(|name| self.parents_done.contains(name))
  }

  fn neighbors_done(&mut self) -> bool {
    self.all_children_done() || self.all_parents_done()
  }

  /// Forget completions recorded for the run that is ending.
  fn clear_completions(&mut self) {
    self.children_done.clear();
    self.parents_done.clear();
  }
}

struct Inner {
  metadata: NodeMetadata,
  state: Mutex<NodeState>,
}

/// The base implementation of a node.
///
/// The lock guarding the state is never held while calling into another
/// node, so two neighbors finishing at the same time cannot deadlock.
pub struct BaseNode {
  inner: Arc<Inner>,
}

impl BaseNode {
  pub fn new(metadata: NodeMetadata) -> Self {
    Self {
      inner: Arc::new(Inner {
        metadata,
        state: Mutex::new(NodeState::default()),
      }),
    }
  }

  fn handle(&self) -> BaseNode {
    BaseNode {
      inner: Arc::clone(&self.inner),
    }
  }

  fn lock(&self) -> MutexGuard<'_, NodeState> {
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn metadata(&self) -> &NodeMetadata {
    &self.inner.metadata
  }

  /// The execution scope of the current (or last) run.
  pub fn context(&self) -> Option<CancellationToken> {
    self.lock().token.clone()
  }

  /// Options of the current (or last) run.
  pub fn options(&self) -> StartOptions {
    self.lock().options.clone()
  }

  pub fn status(&self) -> Status {
    self.lock().status
  }

  /// True if the node never started or its scope has been cancelled.
  pub fn is_stopped(&self) -> bool {
    match &self.lock().token {
      Some(token) => token.is_cancelled(),
      None => true,
    }
  }

  /// Start the node.
  ///
  /// Only the first call of an activation cycle has an effect; the cycle ends
  /// when the node is stopped. Nothing happens if `scope` is already
  /// cancelled. Otherwise a tracked task is obtained from `factory`, a child
  /// scope of `scope` is created, and `exec` is spawned with both.
  pub fn start<F, Fut>(
    &self,
    scope: &CancellationToken,
    options: &StartOptions,
    factory: &TaskFactory,
    exec: F,
  ) where
    F: FnOnce(Task, CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
  {
    let (token, generation, settled) = {
      let mut state = self.lock();
      if state.started {
        return;
      }
      if scope.is_cancelled() {
        debug!(node = %self.metadata().name, "scope already cancelled, not starting");
        return;
      }

      let token = scope.child_token();
      state.started = true;
      state.stopped = false;
      state.status = Status::Running;
      state.options = options.clone();
      state.token = Some(token.clone());
      state.generation += 1;
      // Neighbors may have finished before this node was started.
      let settled = state.options.stop_when_nodes_are_done && state.neighbors_done();
      (token, state.generation, settled)
    };

    let task = factory();
    debug!(node = %self.metadata().name, task_id = task.id(), "starting node");

    let node = self.handle();
    tokio::spawn(async move {
      let run_task = task.clone();
      let run = AssertUnwindSafe(async move { exec(run_task, token).await });
      if let Err(panic) = run.catch_unwind().await {
        error!(
          node = %node.metadata().name,
          panic = panic_message(panic.as_ref()),
          "node execution panicked"
        );
      }

      let current = node.finish_run(generation);
      task.done();
      if !current {
        return;
      }

      let metadata = node.metadata();
      for child in node.children() {
        child.parent_is_done(metadata);
      }
      for parent in node.parents() {
        parent.child_is_done(metadata);
      }
    });

    if settled {
      debug!(node = %self.metadata().name, "neighbors already done");
      self.stop();
    }
  }

  /// Ends the run identified by `generation`. Returns false if a newer run
  /// has started since, in which case nothing is touched.
  fn finish_run(&self, generation: u64) -> bool {
    {
      let mut state = self.lock();
      if state.generation != generation {
        debug!(node = %self.metadata().name, "superseded run finished");
        return false;
      }
      state.clear_completions();
    }
    self.stop();
    true
  }

  /// Stop the node.
  ///
  /// Only the first call after a start has an effect. The execution scope is
  /// cancelled but the exec function is not awaited.
  pub fn stop(&self) {
    let token = {
      let mut state = self.lock();
      if state.stopped {
        return;
      }
      state.stopped = true;
      if state.started {
        state.clear_completions();
      }
      state.started = false;
      state.status = Status::Stopped;
      state.token.clone()
    };

    if let Some(token) = token {
      debug!(node = %self.metadata().name, "stopping node");
      token.cancel();
    }
  }

  /// Switch a running node to paused. Returns whether the status changed.
  pub fn pause(&self) -> bool {
    let mut state = self.lock();
    if state.status != Status::Running {
      return false;
    }
    state.status = Status::Paused;
    true
  }

  /// Switch a paused node back to running. Returns whether the status changed.
  pub fn resume(&self) -> bool {
    let mut state = self.lock();
    if state.status != Status::Paused {
      return false;
    }
    state.status = Status::Running;
    true
  }

  pub fn add_child(&self, node: Arc<dyn Node>) {
    let name = node.metadata().name.clone();
    self.lock().children.entry(name).or_insert(node);
  }

  pub fn del_child(&self, name: &str) {
    let mut state = self.lock();
    state.children.remove(name);
    state.children_done.remove(name);
  }

  pub fn child_is_done(&self, metadata: &NodeMetadata) {
    let should_stop = {
      let mut state = self.lock();
      if !state.children.contains_key(&metadata.name) {
        return;
      }
      state.children_done.insert(metadata.name.clone());
      state.started && state.options.stop_when_nodes_are_done && state.all_children_done()
    };

    if should_stop {
      debug!(node = %self.metadata().name, "all children are done");
      self.stop();
    }
  }

  pub fn children(&self) -> Vec<Arc<dyn Node>> {
    self.lock().children.values().cloned().collect()
  }

  pub fn add_parent(&self, node: &Arc<dyn Node>) {
    let name = node.metadata().name.clone();
    self
      .lock()
      .parents
      .entry(name)
      .or_insert_with(|| Arc::downgrade(node));
  }

  pub fn del_parent(&self, name: &str) {
    let mut state = self.lock();
    state.parents.remove(name);
    state.parents_done.remove(name);
  }

  pub fn parent_is_done(&self, metadata: &NodeMetadata) {
    let should_stop = {
      let mut state = self.lock();
      if !state.parents.contains_key(&metadata.name) {
        return;
      }
      state.parents_done.insert(metadata.name.clone());
      state.started && state.options.stop_when_nodes_are_done && state.all_parents_done()
    };

    if should_stop {
      debug!(node = %self.metadata().name, "all parents are done");
      self.stop();
    }
  }

  pub fn parents(&self) -> Vec<Arc<dyn Node>> {
    self
      .lock()
      .parents
      .values()
      .filter_map(Weak::upgrade)
      .collect()
  }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
  if let Some(s) = panic.downcast_ref::<&str>() {
    s
  } else if let Some(s) = panic.downcast_ref::<String>() {
    s.as_str()
  } else {
    "unknown panic"
  }
}

/// Gives access to an embedded [`BaseNode`].
///
/// Implementing this provides [`NodeDescriptor`], [`NodeParent`] and
/// [`NodeChild`]; concrete nodes only implement `Starter` and `Pauser`.
pub trait AsBaseNode {
  fn base_node(&self) -> &BaseNode;
}

impl<T: AsBaseNode> NodeDescriptor for T {
  fn metadata(&self) -> &NodeMetadata {
    self.base_node().metadata()
  }
}

impl<T: AsBaseNode> NodeParent for T {
  fn add_child(&self, node: Arc<dyn Node>) {
    self.base_node().add_child(node)
  }

  fn del_child(&self, name: &str) {
    self.base_node().del_child(name)
  }

  fn child_is_done(&self, metadata: &NodeMetadata) {
    self.base_node().child_is_done(metadata)
  }

  fn children(&self) -> Vec<Arc<dyn Node>> {
    self.base_node().children()
  }
}

impl<T: AsBaseNode> NodeChild for T {
  fn add_parent(&self, node: &Arc<dyn Node>) {
    self.base_node().add_parent(node)
  }

  fn del_parent(&self, name: &str) {
    self.base_node().del_parent(name)
  }

  fn parent_is_done(&self, metadata: &NodeMetadata) {
    self.base_node().parent_is_done(metadata)
  }

  fn parents(&self) -> Vec<Arc<dyn Node>> {
    self.base_node().parents()
  }
}
