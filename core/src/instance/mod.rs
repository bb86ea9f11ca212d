//! Instance session
//!
//! Ties the encounter registry, gate and minion link tables, scenario tracker,
//! save queue and participant transport of one instance together. Every
//! mutating entry point runs to completion before the next one starts; the
//! session is owned by a single task.

mod event;
mod handler;
mod processor;
mod session;
mod signal;

#[cfg(test)]
mod session_tests;

pub use event::{WorldEvent, WorldEventKind};
pub use handler::InstanceSignalHandler;
pub use session::InstanceSession;
pub use signal::InstanceSignal;
