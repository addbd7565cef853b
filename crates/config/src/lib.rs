//! Configuration for the callscribe backend
//!
//! Layered loading (highest priority last):
//! `config/default.yaml` -> `config/{env}.yaml` -> `CALLSCRIBE__*` env vars.

pub mod settings;

pub use settings::{
    load_settings, AnalysisConfig, CarrierConfig, DatabaseConfig, ObservabilityConfig,
    ServerConfig, Settings, StorageConfig, TranscriptionConfig,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
