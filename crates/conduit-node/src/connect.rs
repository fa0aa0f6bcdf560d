use std::sync::Arc;

use crate::traits::Node;

/// Connect two nodes as parent and child.
///
/// No cycle detection is performed; callers are expected to build a DAG.
pub fn connect(parent: &Arc<dyn Node>, child: &Arc<dyn Node>) {
  parent.add_child(Arc::clone(child));
  child.add_parent(parent);
}

/// Remove the edge between two nodes in both directions.
pub fn disconnect(parent: &Arc<dyn Node>, child: &Arc<dyn Node>) {
  parent.del_child(&child.metadata().name);
  child.del_parent(&parent.metadata().name);
}
