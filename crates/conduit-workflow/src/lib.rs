//! Conduit Workflow
//!
//! The [`Workflow`] coordinates a graph of nodes: it indexes them by name,
//! starts them (optionally in groups sharing one tracked task), and drives
//! stop, pause, and continue across the whole graph.
//!
//! # Architecture
//!
//! ```text
//! Workflow
//! ├── root: BaseNode        - aggregation point, its exec drives the run
//! ├── registry              - name -> node, rebuilt by index_nodes()
//! ├── emitter               - started / paused / stopped / error events
//! └── closer                - releases resources once every node is done
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let task = Task::new();
//! let workflow = Workflow::new(
//!   "transcode",
//!   CancellationToken::new(),
//!   Arc::new(LogEmitter),
//!   task.factory(),
//!   Arc::new(Closer::new()),
//! );
//!
//! workflow.add_child(decoder.clone());
//! connect(&decoder, &encoder);
//! workflow.index_nodes();
//!
//! workflow.start();
//! task.wait().await;
//! ```

mod closer;
mod error;
mod workflow;

pub use closer::{BoxError, CloseError, Closer};
pub use error::WorkflowError;
pub use workflow::{GroupCallback, Workflow, WorkflowStartGroup, WorkflowStartOptions};
