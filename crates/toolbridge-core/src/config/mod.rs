//! Configuration
//!
//! Sources, lowest precedence first:
//! - `FileConfigProvider::user()`: ~/.config/toolbridge/config.yaml
//! - `FileConfigProvider::workspace(cwd)`: .config/toolbridge/config.yaml
//! - an explicit `--config` file
//!
//! `MemoryConfigProvider` stands in for files in tests.

mod traits;
mod settings;
mod credentials;
mod memory;
mod file;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use settings::{
    default_model, BackendSection, BridgeConfig, ConfigFile, ProviderSection, ProviderSettings,
    SessionSection, SessionSettings, Transport,
};
pub use credentials::env_vars_for;
pub use memory::MemoryConfigProvider;
pub use file::{FileConfigProvider, ConfigLevel};

/// Load and overlay several sources in order; later sources win
pub async fn load_layered(sources: &[&dyn ConfigProvider]) -> ConfigResult<ConfigFile> {
    let mut merged = ConfigFile::default();
    for source in sources {
        merged = merged.merge(source.load().await?);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    #[tokio::test]
    async fn test_workspace_overrides_user() {
        let mut user = ConfigFile::default();
        user.backend.kind = Some(BackendKind::OpenAi);
        user.backend.model = Some("gpt-4o".to_string());
        user.session.max_rounds = Some(6);

        let mut workspace = ConfigFile::default();
        workspace.backend.model = Some("gpt-4o-mini".to_string());

        let user = MemoryConfigProvider::with_config(user);
        let workspace = MemoryConfigProvider::with_config(workspace);

        let merged = load_layered(&[&user, &workspace]).await.unwrap();
        let config = merged.resolve(|_| None).unwrap();

        assert_eq!(config.backend.kind, BackendKind::OpenAi);
        assert_eq!(config.backend.model, "gpt-4o-mini");
        assert_eq!(config.session.max_rounds, 6);
    }
}
