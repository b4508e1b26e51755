//! File-based configuration provider (YAML)
//!
//! Supports user-level (~/.config/toolbridge/config.yaml) and workspace-level
//! (.config/toolbridge/config.yaml) config.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::ConfigFile;
use super::traits::{ConfigError, ConfigProvider, ConfigResult};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/toolbridge/config.yaml)
    User,
    /// Workspace-level config (.config/toolbridge/config.yaml in the working directory)
    Workspace,
    /// A file named explicitly, e.g. on the command line
    Explicit,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
            ConfigLevel::Explicit => "explicit",
        }
    }
}

/// File-based configuration provider
///
/// # Example
///
/// ```no_run
/// use toolbridge_core::config::FileConfigProvider;
///
/// let user_config = FileConfigProvider::user();
/// let workspace_config = FileConfigProvider::workspace("/path/to/workspace");
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ConfigFile>>,
}

impl FileConfigProvider {
    /// Create a new file config provider for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config provider (~/.config/toolbridge/config.yaml)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("toolbridge").join("config.yaml"), ConfigLevel::User)
    }

    /// Create a workspace-level config provider (.config/toolbridge/config.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("toolbridge")
            .join("config.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the config level
    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    /// Check if the config file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> ConfigResult<ConfigFile> {
        if !self.path.exists() {
            // An explicitly named file must exist
            if self.level == ConfigLevel::Explicit {
                return Err(ConfigError::Other(format!(
                    "config file not found: {}",
                    self.path.display()
                )));
            }
            return Ok(ConfigFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ConfigFile::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ConfigFile> {
        let config = self.read()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    fn name(&self) -> &str {
        self.level.as_str()
    }

    async fn load(&self) -> ConfigResult<ConfigFile> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    async fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(config)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(config.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::workspace(dir.path());

        assert!(!provider.exists());
        assert_eq!(provider.load().await.unwrap(), ConfigFile::default());
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::new(dir.path().join("nope.yaml"), ConfigLevel::Explicit);

        assert!(provider.load().await.is_err());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let provider = FileConfigProvider::workspace(dir.path());

        let mut config = ConfigFile::default();
        config.backend.kind = Some(BackendKind::Gemini);
        config.session.max_rounds = Some(3);
        provider.save(&config).await.unwrap();

        assert!(provider.path().ends_with(".config/toolbridge/config.yaml"));
        let content = fs::read_to_string(provider.path()).unwrap();
        assert!(content.contains("kind: gemini"));

        let reloaded = provider.reload().unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "backend: [not, a, map").unwrap();
        let provider = FileConfigProvider::new(&path, ConfigLevel::User);

        match provider.load().await {
            Err(ConfigError::Parse { path: reported, .. }) => assert!(reported.ends_with("config.yaml")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
