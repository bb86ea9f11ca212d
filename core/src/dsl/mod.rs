//! Instance definitions
//!
//! Stateless definitions parsed from TOML files. Each file describes the
//! static link tables of one instance and is handed by value to the
//! session that runs it, so concurrent instances never share tables.
//!
//! - **definition**: Instance, encounter, gate, minion, credit and scenario definitions
//! - **loader**: TOML loading, validation, indexing and saving

mod definition;
mod error;
mod loader;

pub use definition::*;
pub use error::{DslError, ScenarioDefinitionError};
pub use loader::*;
