//! Application configuration
//!
//! This module re-exports the shared config type from sanctum-types and
//! provides platform-specific defaults and persistence for AppConfig.

use std::path::PathBuf;

pub use sanctum_types::AppConfig;

use super::ConfigError;

const APP_NAME: &str = "sanctum";
const CONFIG_NAME: &str = "config";

// ─────────────────────────────────────────────────────────────────────────────
// Platform-Specific Defaults
// ─────────────────────────────────────────────────────────────────────────────

fn default_data_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

fn default_data_directory() -> String {
    default_data_root()
        .join("instances")
        .to_string_lossy()
        .into_owned()
}

fn default_definitions_directory() -> String {
    default_data_root()
        .join("definitions")
        .to_string_lossy()
        .into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// AppConfig Extensions
// ─────────────────────────────────────────────────────────────────────────────

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    /// Load the stored config, falling back to defaults. The load error is
    /// returned instead of logged, so it can be reported once logging is up.
    fn load_or_defaults() -> (Self, Option<ConfigError>);
    fn try_load() -> Result<Self, ConfigError>;
    /// Config with platform-specific defaults (used when no config file exists)
    fn load_with_defaults() -> Self;
    fn save(&self) -> Result<(), ConfigError>;
    /// Fill empty directories with platform defaults.
    fn fill_defaults(&mut self);
}

impl AppConfigExt for AppConfig {
    fn load_or_defaults() -> (Self, Option<ConfigError>) {
        or_defaults(Self::try_load())
    }

    fn try_load() -> Result<Self, ConfigError> {
        let mut config: AppConfig = confy::load(APP_NAME, CONFIG_NAME)?;
        config.fill_defaults();
        Ok(config)
    }

    fn load_with_defaults() -> Self {
        AppConfig::with_directories(default_data_directory(), default_definitions_directory())
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn fill_defaults(&mut self) {
        if self.data_directory.is_empty() {
            self.data_directory = default_data_directory();
        }
        if self.definitions_directory.is_empty() {
            self.definitions_directory = default_definitions_directory();
        }
    }
}

fn or_defaults(loaded: Result<AppConfig, ConfigError>) -> (AppConfig, Option<ConfigError>) {
    match loaded {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::load_with_defaults(), Some(e)),
    }
}
