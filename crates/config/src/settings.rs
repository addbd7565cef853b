//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Voice carrier credentials and webhook behavior
    #[serde(default)]
    pub carrier: CarrierConfig,

    /// State store configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Object store configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Speech-to-text provider configuration
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Language-model provider configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.queue_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis.queue_depth".to_string(),
                message: "analysis queue depth must be at least 1".to_string(),
            });
        }

        for (field, timeout) in [
            ("carrier.download_timeout_secs", self.carrier.download_timeout_secs),
            ("storage.timeout_secs", self.storage.timeout_secs),
            ("transcription.timeout_secs", self.transcription.timeout_secs),
            ("analysis.timeout_secs", self.analysis.timeout_secs),
        ] {
            if timeout == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "timeout must be at least 1 second".to_string(),
                });
            }
        }

        if !self.database.in_memory && self.database.hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.hosts".to_string(),
                message: "at least one ScyllaDB host is required".to_string(),
            });
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty means any, for local development)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_enabled: default_true(),
            cors_origins: Vec::new(),
        }
    }
}

/// Voice carrier configuration
///
/// The account SID and auth token double as HTTP basic-auth credentials when
/// downloading recordings from the carrier's media URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierConfig {
    #[serde(default)]
    pub account_sid: String,

    #[serde(default)]
    pub auth_token: String,

    /// Number calls are placed from (E.164)
    #[serde(default)]
    pub from_number: String,

    /// Fallback dial target for inbound calls when no redirect number has
    /// been stored through the API
    #[serde(default)]
    pub default_redirect_number: Option<String>,

    /// Recording download timeout
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,
}

fn default_download_timeout() -> u64 {
    60
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            default_redirect_number: None,
            download_timeout_secs: default_download_timeout(),
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// ScyllaDB contact points
    #[serde(default = "default_db_hosts")]
    pub hosts: Vec<String>,

    #[serde(default = "default_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication")]
    pub replication_factor: u8,

    /// Use the in-process store instead of ScyllaDB (tests, local runs)
    #[serde(default)]
    pub in_memory: bool,
}

fn default_db_hosts() -> Vec<String> {
    vec!["127.0.0.1:9042".to_string()]
}
fn default_keyspace() -> String {
    "callscribe".to_string()
}
fn default_replication() -> u8 {
    1
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            hosts: default_db_hosts(),
            keyspace: default_keyspace(),
            replication_factor: default_replication(),
            in_memory: false,
        }
    }
}

/// Object store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base URL of the S3-style HTTP store
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Bearer token for the store
    #[serde(default)]
    pub api_token: String,

    /// Key prefix for recording blobs
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,

    /// Use the in-process store instead of the HTTP store (tests, local runs)
    #[serde(default)]
    pub in_memory: bool,
}

fn default_bucket() -> String {
    "call-recordings".to_string()
}
fn default_key_prefix() -> String {
    "recordings".to_string()
}
fn default_storage_timeout() -> u64 {
    30
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bucket: default_bucket(),
            api_token: String::new(),
            key_prefix: default_key_prefix(),
            timeout_secs: default_storage_timeout(),
            in_memory: false,
        }
    }
}

/// Speech-to-text provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_transcription_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_transcription_model")]
    pub model: String,

    #[serde(default = "default_transcription_timeout")]
    pub timeout_secs: u64,
}

fn default_transcription_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_transcription_model() -> String {
    "whisper-1".to_string()
}
fn default_transcription_timeout() -> u64 {
    120
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcription_url(),
            api_key: String::new(),
            model: default_transcription_model(),
            timeout_secs: default_transcription_timeout(),
        }
    }
}

/// Language-model provider configuration for the question engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// OpenAI-compatible base URL
    #[serde(default = "default_model_url")]
    pub base_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model_name")]
    pub model: String,

    /// Per-question model call timeout
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Bounded depth of the background analysis queue
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

fn default_model_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}
fn default_model_timeout() -> u64 {
    30
}
fn default_queue_depth() -> usize {
    64
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            api_key: String::new(),
            model: default_model_name(),
            timeout_secs: default_model_timeout(),
            queue_depth: default_queue_depth(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Enable the Prometheus endpoint
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: default_true(),
        }
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (CALLSCRIBE prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("CALLSCRIBE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.keyspace, "callscribe");
        assert_eq!(settings.storage.key_prefix, "recordings");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = Settings::default();
        settings.transcription.timeout_secs = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_hosts_rejected_unless_in_memory() {
        let mut settings = Settings::default();
        settings.database.hosts.clear();
        assert!(settings.validate().is_err());

        settings.database.in_memory = true;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_zero_queue_depth_rejected() {
        let mut settings = Settings::default();
        settings.analysis.queue_depth = 0;
        assert!(settings.validate().is_err());
    }
}
