//! Storage module for persisting instance progress.
//!
//! Each instance is saved as a single snapshot: the encoded encounter states
//! plus a completed-encounter bitmask. Files are named `{instance_id:08}.toml`
//! (e.g., 00000042.toml).

pub mod codec;
mod error;
mod store;
mod writer;

pub use error::StorageError;
pub use store::{FileStateStore, MemoryStateStore, SavedInstance, StateStore};
pub use writer::{SaveQueue, SaveRequest, WriterStats, run_writer, spawn_writer};

/// Generate the save filename for an instance.
pub fn instance_filename(instance_id: u32) -> String {
    format!("{:08}.toml", instance_id)
}
