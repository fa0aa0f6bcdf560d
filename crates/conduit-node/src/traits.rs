use std::sync::Arc;

use conduit_task::TaskFactory;
use tokio_util::sync::CancellationToken;

use crate::metadata::NodeMetadata;
use crate::options::StartOptions;

/// An object that can describe itself.
pub trait NodeDescriptor {
  fn metadata(&self) -> &NodeMetadata;
}

/// An object with child nodes.
pub trait NodeParent {
  /// Register a child. Registering a name twice is a no-op.
  fn add_child(&self, node: Arc<dyn Node>);

  /// Remove the child with the given name, if any.
  fn del_child(&self, name: &str);

  /// Record that a child finished. Unknown children are ignored.
  fn child_is_done(&self, metadata: &NodeMetadata);

  /// Children sorted by name.
  fn children(&self) -> Vec<Arc<dyn Node>>;
}

/// An object with parent nodes.
pub trait NodeChild {
  /// Register a parent. Only a weak handle is kept.
  fn add_parent(&self, node: &Arc<dyn Node>);

  /// Remove the parent with the given name, if any.
  fn del_parent(&self, name: &str);

  /// Record that a parent finished. Unknown parents are ignored.
  fn parent_is_done(&self, metadata: &NodeMetadata);

  /// Parents still alive, sorted by name.
  fn parents(&self) -> Vec<Arc<dyn Node>>;
}

/// An object that can be started and stopped.
pub trait Starter {
  fn is_stopped(&self) -> bool;

  /// Start the node under `scope`. Starting an already started node is a
  /// no-op. The node obtains its tracked task from `factory`.
  fn start(self: Arc<Self>, scope: &CancellationToken, options: &StartOptions, factory: TaskFactory);

  /// Cancel the node's execution scope. Does not wait for it to return.
  fn stop(&self);
}

/// An object that can be paused and resumed.
///
/// What pausing means is up to the node, e.g. halting consumption without
/// releasing resources.
pub trait Pauser {
  fn pause(&self);
  fn resume(&self);
}

/// A node of a processing graph.
pub trait Node: NodeDescriptor + NodeParent + NodeChild + Starter + Pauser + Send + Sync {}

impl<T> Node for T where T: NodeDescriptor + NodeParent + NodeChild + Starter + Pauser + Send + Sync {}
