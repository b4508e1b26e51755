//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::settings::ConfigFile;
use super::traits::{ConfigProvider, ConfigResult};

/// In-memory configuration provider for testing
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<ConfigFile>,
}

impl MemoryConfigProvider {
    /// Create a new empty memory config provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory config provider with initial contents
    pub fn with_config(config: ConfigFile) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self) -> ConfigResult<ConfigFile> {
        Ok(self.config.read().clone())
    }

    async fn save(&self, config: &ConfigFile) -> ConfigResult<()> {
        *self.config.write() = config.clone();
        Ok(())
    }
}
