//! Application configuration management.

use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Attachment storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Raw storage settings as read from config files and environment.
///
/// `provider` selects which of the remaining fields are required:
/// `local_fs` uses `root`; `s3` uses `endpoint`, `bucket`, `access_key_id`,
/// `secret_access_key` and `region`; `azure_blob` uses `account`,
/// `access_key` and `container`; `memory` uses nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Provider name.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Root directory for the local filesystem provider.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// S3 endpoint URL.
    pub endpoint: Option<String>,
    /// S3 bucket name.
    pub bucket: Option<String>,
    /// S3 access key ID.
    pub access_key_id: Option<String>,
    /// S3 secret access key.
    pub secret_access_key: Option<String>,
    /// S3 region.
    pub region: Option<String>,
    /// Azure storage account name.
    pub account: Option<String>,
    /// Azure storage access key.
    pub access_key: Option<String>,
    /// Azure container name.
    pub container: Option<String>,
    /// Maximum attachment size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Chunk size used for streamed writes and reads.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_provider() -> String {
    "local_fs".to_string()
}

fn default_root() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_max_file_size() -> u64 {
    5 * 1024 * 1024 // 5 MiB
}

fn default_chunk_size() -> usize {
    256 * 1024
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            root: default_root(),
            endpoint: None,
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            region: None,
            account: None,
            access_key: None,
            container: None,
            max_file_size: default_max_file_size(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directives used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "applytrack=info,sea_orm=warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones overriding earlier ones: `config/default`,
    /// `config/{RUN_MODE}`, then `APPLYTRACK__*` environment variables
    /// (e.g. `APPLYTRACK__DATABASE__URL`).
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("APPLYTRACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
