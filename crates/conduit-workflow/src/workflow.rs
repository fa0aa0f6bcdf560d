//! Workflow coordinator.

use std::collections::{BTreeMap, HashMap};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard};

use conduit_event::{Event, EventEmitter};
use conduit_node::{
  BaseNode, Node, NodeDescriptor, NodeMetadata, NodeParent, Pauser, StartOptions, Starter, Status,
};
use conduit_task::{Task, TaskFactory};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::closer::Closer;
use crate::error::WorkflowError;

/// Invoked with a group's tracked task once the group's nodes are started.
pub type GroupCallback = Box<dyn FnOnce(Task) + Send>;

/// Nodes started together under one shared tracked task.
pub struct WorkflowStartGroup {
  pub nodes: Vec<Arc<dyn Node>>,
  pub callback: Option<GroupCallback>,
}

impl WorkflowStartGroup {
  pub fn new(nodes: Vec<Arc<dyn Node>>) -> Self {
    Self {
      nodes,
      callback: None,
    }
  }

  pub fn with_callback<F>(mut self, callback: F) -> Self
  where
    F: FnOnce(Task) + Send + 'static,
  {
    self.callback = Some(Box::new(callback));
    self
  }
}

/// Options of a single workflow start.
#[derive(Default)]
pub struct WorkflowStartOptions {
  /// Nodes not named in any group are started individually.
  pub groups: Vec<WorkflowStartGroup>,
  /// Options every node is started with.
  pub node: StartOptions,
}

#[derive(Default)]
struct WorkflowState {
  nodes: BTreeMap<String, Arc<dyn Node>>,
  /// Top-level task of the active run.
  task: Option<Task>,
}

/// Coordinates the lifecycle of a graph of nodes.
pub struct Workflow {
  name: String,
  root: BaseNode,
  scope: CancellationToken,
  emitter: Arc<dyn EventEmitter>,
  factory: TaskFactory,
  closer: Arc<Closer>,
  state: Mutex<WorkflowState>,
}

impl Workflow {
  /// Create a new workflow.
  ///
  /// # Arguments
  /// * `name` - Name used in events and logs
  /// * `scope` - Cancelling it stops every node of the workflow
  /// * `emitter` - Receives lifecycle and error events
  /// * `factory` - Creates the top-level task of each run
  /// * `closer` - Closed once every node of a run is done
  pub fn new(
    name: impl Into<String>,
    scope: CancellationToken,
    emitter: Arc<dyn EventEmitter>,
    factory: TaskFactory,
    closer: Arc<Closer>,
  ) -> Arc<Self> {
    Arc::new(Self {
      name: name.into(),
      root: BaseNode::new(
        NodeMetadata::new("root")
          .with_label("root")
          .with_description("root"),
      ),
      scope,
      emitter,
      factory,
      closer,
      state: Mutex::new(WorkflowState::default()),
    })
  }

  fn lock(&self) -> MutexGuard<'_, WorkflowState> {
    self
      .state
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn closer(&self) -> &Arc<Closer> {
    &self.closer
  }

  /// Top-level task of the active run, if running.
  pub fn task(&self) -> Option<Task> {
    self.lock().task.clone()
  }

  pub fn status(&self) -> Status {
    self.root.status()
  }

  pub fn add_child(&self, node: Arc<dyn Node>) {
    self.root.add_child(node);
  }

  pub fn del_child(&self, name: &str) {
    self.root.del_child(name);
  }

  /// Top-level nodes sorted by name.
  pub fn children(&self) -> Vec<Arc<dyn Node>> {
    self.root.children()
  }

  /// Rebuild the name registry by walking the graph from the root.
  ///
  /// Must be called after structural changes for [`Workflow::node`] to
  /// reflect them.
  pub fn index_nodes(&self) {
    let mut nodes = BTreeMap::new();
    index(self.root.children(), &mut nodes);
    debug!(workflow = %self.name, count = nodes.len(), "indexed nodes");
    self.lock().nodes = nodes;
  }

  /// Look up an indexed node by name.
  pub fn node(&self, name: &str) -> Result<Arc<dyn Node>, WorkflowError> {
    self
      .lock()
      .nodes
      .get(name)
      .cloned()
      .ok_or_else(|| WorkflowError::NodeNotFound {
        name: name.to_string(),
      })
  }

  /// Every indexed node, sorted by name.
  pub fn nodes(&self) -> Vec<Arc<dyn Node>> {
    self.lock().nodes.values().cloned().collect()
  }

  /// Start every indexed node individually.
  pub fn start(self: &Arc<Self>) {
    self.start_with_options(WorkflowStartOptions::default());
  }

  /// Start every indexed node, grouping them as requested.
  ///
  /// Returns immediately; the run itself happens on the root node's task.
  /// Starting a workflow that is already running is a no-op.
  pub fn start_with_options(self: &Arc<Self>, options: WorkflowStartOptions) {
    let nodes = self.nodes();
    let this = Arc::clone(self);
    let root_options = options.node.clone();
    self
      .root
      .start(&self.scope, &root_options, &self.factory, move |task, token| async move {
        this.run(nodes, options, task, token).await
      });
  }

  #[instrument(name = "workflow_run", skip_all, fields(workflow = %self.name))]
  async fn run(
    &self,
    nodes: Vec<Arc<dyn Node>>,
    options: WorkflowStartOptions,
    task: Task,
    token: CancellationToken,
  ) {
    debug!(workflow = %self.name, "starting workflow");
    self.lock().task = Some(task.clone());

    let WorkflowStartOptions {
      groups,
      node: node_options,
    } = options;

    // First group naming a node wins
    let mut membership: HashMap<String, usize> = HashMap::new();
    for (i, group) in groups.iter().enumerate() {
      for n in &group.nodes {
        membership.entry(n.metadata().name.clone()).or_insert(i);
      }
    }

    let mut members: Vec<Vec<Arc<dyn Node>>> = groups.iter().map(|_| Vec::new()).collect();
    for n in nodes {
      let group = membership.get(&n.metadata().name).copied();
      match group {
        Some(i) => members[i].push(n),
        None => n.start(&token, &node_options, task.factory()),
      }
    }

    for (group, group_nodes) in groups.into_iter().zip(members) {
      let group_task = task.new_subtask();
      for n in group_nodes {
        n.start(&token, &node_options, group_task.factory());
      }
      if let Some(callback) = group.callback {
        let handle = group_task.clone();
        if catch_unwind(AssertUnwindSafe(move || callback(handle))).is_err() {
          error!(workflow = %self.name, group = group_task.id(), "group callback panicked");
        }
      }
      group_task.done();
    }

    self.emitter.emit(Event::WorkflowStarted {
      workflow: self.name.clone(),
    });

    task.wait().await;

    if let Err(source) = self.closer.close() {
      let err = WorkflowError::Close {
        workflow: self.name.clone(),
        source,
      };
      error!(workflow = %self.name, error = %err, "closing workflow failed");
      self.emitter.emit(Event::error(&err));
    }

    self.lock().task = None;
    info!(workflow = %self.name, "workflow finished");

    self.emitter.emit(Event::WorkflowStopped {
      workflow: self.name.clone(),
    });
  }

  /// Stop the workflow. Cancellation cascades to every started node.
  pub fn stop(&self) {
    debug!(workflow = %self.name, "stopping workflow");
    self.root.stop();
  }

  /// Pause every indexed node. No-op unless the workflow is running.
  pub fn pause(&self) {
    if !self.root.pause() {
      return;
    }

    debug!(workflow = %self.name, "pausing workflow");
    for n in self.nodes() {
      n.pause();
    }

    self.emitter.emit(Event::WorkflowPaused {
      workflow: self.name.clone(),
    });
  }

  /// Continue a paused workflow. No-op unless the workflow is paused.
  pub fn resume(&self) {
    if !self.root.resume() {
      return;
    }

    debug!(workflow = %self.name, "continuing workflow");
    for n in self.nodes() {
      n.resume();
    }

    self.emitter.emit(Event::WorkflowStarted {
      workflow: self.name.clone(),
    });
  }
}

fn index(nodes: Vec<Arc<dyn Node>>, registry: &mut BTreeMap<String, Arc<dyn Node>>) {
  for n in nodes {
    let name = n.metadata().name.clone();
    if registry.contains_key(&name) {
      continue;
    }
    let children = n.children();
    registry.insert(name, n);
    index(children, registry);
  }
}
