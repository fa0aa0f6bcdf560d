//! Conduit Event
//!
//! Events announce workflow lifecycle transitions and errors. The workflow
//! coordinator and concrete nodes publish them through an [`EventEmitter`];
//! consumers decide what to do with them (log, stream to a UI, ignore).

mod emitter;
mod event;

pub use emitter::{ChannelEmitter, EventEmitter, LogEmitter, NoopEmitter};
pub use event::Event;
