//! Conduit Config
//!
//! Serializable pipeline definitions. A pipeline file names the nodes of a
//! graph, the edges between them, and optional start groups:
//!
//! ```json
//! {
//!   "name": "fan-in",
//!   "stop_when_nodes_are_done": true,
//!   "nodes": [
//!     { "name": "left", "type": "ticker", "count": 3, "interval_ms": 100 },
//!     { "name": "right", "type": "ticker", "count": 5, "interval_ms": 50 },
//!     { "name": "sink", "type": "relay" }
//!   ],
//!   "edges": [
//!     { "from": "left", "to": "sink" },
//!     { "from": "right", "to": "sink" }
//!   ],
//!   "groups": [["left", "right"]]
//! }
//! ```
//!
//! Definitions are checked with [`PipelineDef::validate`] before anything is
//! built from them.

mod error;
mod node;
mod pipeline;

pub use error::ConfigError;
pub use node::{NodeDef, NodeKind};
pub use pipeline::{EdgeDef, PipelineDef};
