//! Configuration provider trait

use async_trait::async_trait;

use super::settings::ConfigFile;

/// Configuration source
///
/// Implementations:
/// - `FileConfigProvider`: YAML file (user or workspace level)
/// - `MemoryConfigProvider`: In-memory for testing
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Source name, for messages
    fn name(&self) -> &str;

    /// Read the configuration; a missing source yields an empty file
    async fn load(&self) -> ConfigResult<ConfigFile>;

    /// Replace the stored configuration
    async fn save(&self, config: &ConfigFile) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Other(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
