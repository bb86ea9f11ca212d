//! Save backends.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::StorageError;
use super::instance_filename;

/// Everything persisted for one instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedInstance {
    pub instance_id: u32,
    /// Encoded encounter states (see `storage::codec`)
    pub data: String,
    /// Completed-encounter summary kept for older consumers
    #[serde(default)]
    pub completed_mask: u32,
}

/// Durable storage for instance saves.
///
/// Writes always carry the complete current snapshot, so applying the same
/// save twice is harmless.
pub trait StateStore: Send + Sync {
    fn put(&self, instance_id: u32, data: &str, completed_mask: u32) -> Result<(), StorageError>;

    fn get(&self, instance_id: u32) -> Result<Option<SavedInstance>, StorageError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File Store
// ─────────────────────────────────────────────────────────────────────────────

/// One TOML file per instance inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, instance_id: u32) -> PathBuf {
        self.dir.join(instance_filename(instance_id))
    }
}

impl StateStore for FileStateStore {
    fn put(&self, instance_id: u32, data: &str, completed_mask: u32) -> Result<(), StorageError> {
        let saved = SavedInstance {
            instance_id,
            data: data.to_string(),
            completed_mask,
        };
        let content = toml::to_string(&saved)
            .map_err(|source| StorageError::Encode { instance_id, source })?;

        let path = self.path_for(instance_id);
        fs::write(&path, content).map_err(|source| StorageError::WriteFile { path, source })
    }

    fn get(&self, instance_id: u32) -> Result<Option<SavedInstance>, StorageError> {
        let path = self.path_for(instance_id);
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| StorageError::ReadFile {
            path: path.clone(),
            source,
        })?;
        let saved = toml::from_str(&content).map_err(|source| StorageError::Decode { path, source })?;
        Ok(Some(saved))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory Store
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory store. Can be told to reject writes to exercise failure paths.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    saves: Mutex<HashMap<u32, SavedInstance>>,
    history: Mutex<Vec<SavedInstance>>,
    reject_writes: AtomicBool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Every accepted write, in the order it was applied.
    pub fn history(&self) -> Vec<SavedInstance> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl StateStore for MemoryStateStore {
    fn put(&self, instance_id: u32, data: &str, completed_mask: u32) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected {
                instance_id,
                reason: "writes disabled".to_string(),
            });
        }

        let saved = SavedInstance {
            instance_id,
            data: data.to_string(),
            completed_mask,
        };
        let poisoned = || StorageError::Rejected {
            instance_id,
            reason: "store lock poisoned".to_string(),
        };
        self.history.lock().map_err(|_| poisoned())?.push(saved.clone());
        self.saves.lock().map_err(|_| poisoned())?.insert(instance_id, saved);
        Ok(())
    }

    fn get(&self, instance_id: u32) -> Result<Option<SavedInstance>, StorageError> {
        let saves = self.saves.lock().map_err(|_| StorageError::Rejected {
            instance_id,
            reason: "store lock poisoned".to_string(),
        })?;
        Ok(saves.get(&instance_id).cloned())
    }
}
