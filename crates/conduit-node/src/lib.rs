//! Conduit Node
//!
//! The node capability set and its reusable implementation.
//!
//! A node has an identity ([`NodeMetadata`]), graph edges to parents and
//! children, and a start/stop lifecycle. Concrete node types embed a
//! [`BaseNode`], expose it through [`AsBaseNode`], and only supply the
//! function that does their work:
//!
//! ```ignore
//! struct Encoder {
//!   base: BaseNode,
//! }
//!
//! impl AsBaseNode for Encoder {
//!   fn base_node(&self) -> &BaseNode {
//!     &self.base
//!   }
//! }
//!
//! impl Starter for Encoder {
//!   fn is_stopped(&self) -> bool {
//!     self.base.is_stopped()
//!   }
//!
//!   fn start(self: Arc<Self>, scope: &CancellationToken, options: &StartOptions, factory: TaskFactory) {
//!     let this = self.clone();
//!     self.base.start(scope, options, &factory, move |task, token| async move {
//!       this.encode(task, token).await
//!     });
//!   }
//!
//!   fn stop(&self) {
//!     self.base.stop()
//!   }
//! }
//! ```
//!
//! Children are held as owning handles and parents as weak ones, so an
//! acyclic graph never forms a reference cycle.

mod base;
mod connect;
mod metadata;
mod options;
mod traits;

#[cfg(test)]
mod testing;

pub use base::{AsBaseNode, BaseNode};
pub use connect::{connect, disconnect};
pub use metadata::NodeMetadata;
pub use options::{StartOptions, Status};
pub use traits::{Node, NodeChild, NodeDescriptor, NodeParent, Pauser, Starter};

// Re-exported so concrete nodes can name the types used by `Starter::start`.
pub use conduit_task::{Task, TaskFactory};
pub use tokio_util::sync::CancellationToken;
