//! Error types for instance state storage

use std::path::PathBuf;
use thiserror::Error;

/// Errors while persisting or reading instance saves
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create data directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write save file {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read save file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode save for instance {instance_id}")]
    Encode {
        instance_id: u32,
        #[source]
        source: toml::ser::Error,
    },

    #[error("failed to decode save file {path}")]
    Decode {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("save writer for instance {instance_id} has shut down")]
    QueueClosed { instance_id: u32 },

    #[error("storage rejected save for instance {instance_id}: {reason}")]
    Rejected { instance_id: u32, reason: String },
}
