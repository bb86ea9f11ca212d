use chrono::offset;
use sanctum_core::context::AppConfig;
use sanctum_core::dsl::{build_instance_index, load_instance_from_file};
use sanctum_core::instance::InstanceSession;
use sanctum_core::storage::{FileStateStore, StateStore, WriterStats, spawn_writer};
use sanctum_types::EncounterState;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::transport::ConsoleTransport;

/// Shared handle to the running instance.
pub type SessionHandle = Arc<RwLock<InstanceSession<ConsoleTransport>>>;

/// Which instance to run.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Definition file. Looked up by `map_id` in the definitions directory when absent.
    pub definition: Option<PathBuf>,
    pub map_id: Option<u32>,
    pub instance_id: u32,
}

/// Holds all shared state for the CLI application.
/// This is a lightweight container; logic lives in the session itself.
pub struct CliContext {
    pub config: Arc<RwLock<AppConfig>>,
    session: SessionHandle,
    writer: Mutex<Option<JoinHandle<WriterStats>>>,
}

impl CliContext {
    /// Load the definition, restore any saved state and start the save writer.
    pub async fn start(config: AppConfig, options: &SessionOptions) -> Result<Self, String> {
        let path = resolve_definition(&config, options)?;
        let mut definition = load_instance_from_file(&path).map_err(|e| e.to_string())?;
        if !config.scenarios_enabled {
            definition.scenario = None;
        }

        let store = FileStateStore::new(&config.data_directory).map_err(|e| e.to_string())?;
        let saved = store.get(options.instance_id).map_err(|e| e.to_string())?;
        let (queue, writer) = spawn_writer(Arc::new(store));

        let now = offset::Local::now().naive_local();
        let transport = ConsoleTransport::new();
        let mut session = match saved {
            Some(saved) => InstanceSession::restored(
                options.instance_id,
                &definition,
                transport,
                now,
                &saved.data,
                saved.completed_mask,
            ),
            None => InstanceSession::new(options.instance_id, &definition, transport, now),
        }
        .with_save_queue(queue);
        let initialized = session.initialize_encounters(EncounterState::NotStarted);
        tracing::debug!(initialized, "Pending encounters set to not started");

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            session: Arc::new(RwLock::new(session)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn session(&self) -> SessionHandle {
        Arc::clone(&self.session)
    }

    /// Close the save queue and wait for pending saves to land.
    pub async fn shutdown(self) -> Option<WriterStats> {
        let writer = self.writer.lock().await.take();
        // The session owns the only queue sender
        drop(self.session);
        match writer?.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::error!(error = %e, "Save writer task failed");
                None
            }
        }
    }
}

fn resolve_definition(config: &AppConfig, options: &SessionOptions) -> Result<PathBuf, String> {
    if let Some(path) = &options.definition {
        return Ok(path.clone());
    }
    let map_id = options
        .map_id
        .ok_or("error: either --definition or --map is required")?;

    let index = build_instance_index(&PathBuf::from(&config.definitions_directory))
        .map_err(|e| e.to_string())?;
    index
        .get(&map_id)
        .map(|entry| entry.file_path.clone())
        .ok_or_else(|| {
            format!(
                "error: no definition for map {map_id} in {}",
                config.definitions_directory
            )
        })
}
