//! Error types for instance definition files

use std::path::PathBuf;
use thiserror::Error;

/// Errors while reading, indexing or writing instance definitions
#[derive(Debug, Error)]
pub enum DslError {
    #[error("cannot read instance definition {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("instance definition {path} is not valid TOML")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot scan definitions directory {path}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode instance definition as TOML")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot create definitions directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write instance definition {path}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scenario {scenario_id} in {path} is malformed")]
    InvalidScenario {
        path: PathBuf,
        scenario_id: u32,
        #[source]
        source: ScenarioDefinitionError,
    },
}

/// Structural problems in a `[scenario]` table
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScenarioDefinitionError {
    #[error("max_step must be at least 1")]
    NoSteps,

    #[error("step {index} is outside 1..={max_step}")]
    StepOutOfRange { index: u32, max_step: u32 },

    #[error("step {0} is declared twice")]
    DuplicateStep(u32),

    #[error("criteria {criteria_id} appears twice on step {step}")]
    DuplicateCriteria { criteria_id: u32, step: u32 },
}
