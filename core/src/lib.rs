pub mod broadcast;
pub mod context;
pub mod dsl;
pub mod encounter;
pub mod gates;
pub mod instance;
pub mod minions;
pub mod scenario;
pub mod storage;

// Re-exports for convenience
pub use broadcast::{Envelope, MessageBody, Participant, PlayerHandle, Recipient, SessionTransport};
pub use context::{AppConfig, AppConfigExt, ConfigError};
pub use dsl::{DslError, InstanceDefinition, build_instance_index, load_instance_from_file};
pub use encounter::{EncounterIdx, EncounterRegistry, Transition};
pub use gates::{GateId, GateObject, GateStateResolver, TemplateKey};
pub use instance::{InstanceSession, InstanceSignal, InstanceSignalHandler, WorldEvent, WorldEventKind};
pub use minions::{MinionCommand, MinionId, MinionObject, MinionStateSynchronizer, MinionStatus};
pub use sanctum_types::{Boundary, EncounterCreditKind, EncounterState, GateKind, Position};
pub use scenario::{ScenarioProgressTracker, ScenarioUpdate};
pub use storage::{FileStateStore, SaveQueue, StateStore, StorageError, spawn_writer};
