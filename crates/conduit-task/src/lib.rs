//! Conduit Task
//!
//! Hierarchical tracking of concurrently running units of work.
//!
//! A [`Task`] represents one unit. Units spawn tracked children with
//! [`Task::new_subtask`], mark themselves complete with [`Task::done`], and
//! [`Task::wait`] resolves once every descendant has finished. The workflow
//! coordinator uses this to await a whole graph, or a single group of nodes,
//! without keeping its own join handles.
//!
//! ```text
//! root (Task::new)
//! ├── node a (subtask)
//! └── group (subtask)
//!     ├── node b (subtask)
//!     └── node c (subtask)
//! ```

mod task;

pub use task::{Task, TaskFactory};
