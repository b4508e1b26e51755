//! Configuration file layout and resolution
//!
//! ```yaml
//! backend:
//!   kind: anthropic
//!   model: claude-sonnet-4-20250514
//!   api_key_env: MY_ANTHROPIC_KEY
//!   max_tokens: 1000
//! provider:
//!   transport: stdio
//!   command: uv
//!   args: [run, weather.py]
//!   call_timeout_secs: 30
//! session:
//!   max_rounds: 10
//!   concurrent_tool_calls: false
//!   display_truncate: 200
//!   tools:
//!     exclude: [get_forecast]
//! ```
//!
//! Every field is optional so that a workspace file can override single
//! values of the user file.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backends::BackendSettings;
use crate::orchestrator::LoopConfig;
use crate::tools::ToolFilter;
use crate::types::BackendKind;
use super::credentials::resolve_api_key;
use super::traits::{ConfigError, ConfigResult};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "BackendSection::is_empty")]
    pub backend: BackendSection,
    #[serde(default, skip_serializing_if = "ProviderSection::is_empty")]
    pub provider: ProviderSection,
    #[serde(default, skip_serializing_if = "SessionSection::is_empty")]
    pub session: SessionSection,
}

/// `backend:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BackendKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Literal API key; prefer `api_key_env`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// How the tool provider is reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Spawn a child process and talk over stdin/stdout
    #[default]
    Stdio,
    /// Streamable HTTP endpoint
    Http,
}

/// `provider:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_timeout_secs: Option<u64>,
}

/// `session:` section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrent_tool_calls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_truncate: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolFilter>,
}

impl BackendSection {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn merge(self, over: Self) -> Self {
        Self {
            kind: over.kind.or(self.kind),
            model: over.model.or(self.model),
            api_base: over.api_base.or(self.api_base),
            api_key: over.api_key.or(self.api_key),
            api_key_env: over.api_key_env.or(self.api_key_env),
            max_tokens: over.max_tokens.or(self.max_tokens),
            temperature: over.temperature.or(self.temperature),
            system_prompt: over.system_prompt.or(self.system_prompt),
            timeout_secs: over.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl ProviderSection {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn merge(self, over: Self) -> Self {
        Self {
            transport: over.transport.or(self.transport),
            command: over.command.or(self.command),
            args: over.args.or(self.args),
            env: over.env.or(self.env),
            url: over.url.or(self.url),
            call_timeout_secs: over.call_timeout_secs.or(self.call_timeout_secs),
        }
    }
}

impl SessionSection {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn merge(self, over: Self) -> Self {
        Self {
            max_rounds: over.max_rounds.or(self.max_rounds),
            concurrent_tool_calls: over.concurrent_tool_calls.or(self.concurrent_tool_calls),
            display_truncate: over.display_truncate.or(self.display_truncate),
            tools: over.tools.or(self.tools),
        }
    }
}

impl ConfigFile {
    /// Overlay `over` on top of `self`; set values in `over` win
    pub fn merge(self, over: ConfigFile) -> ConfigFile {
        ConfigFile {
            backend: self.backend.merge(over.backend),
            provider: self.provider.merge(over.provider),
            session: self.session.merge(over.session),
        }
    }

    /// Fill in defaults, look up the API key and validate
    ///
    /// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
    /// outside of tests.
    pub fn resolve(self, env: impl Fn(&str) -> Option<String>) -> ConfigResult<BridgeConfig> {
        let backend = self.backend;
        let kind = backend.kind.unwrap_or(BackendKind::Anthropic);
        let model = backend
            .model
            .clone()
            .unwrap_or_else(|| default_model(kind).to_string());
        let api_key = resolve_api_key(&backend, kind, &model, &env);

        let mut settings = BackendSettings::new(kind, model);
        settings.api_key = api_key;
        settings.api_base = backend.api_base;
        settings.system_prompt = backend.system_prompt;
        settings.temperature = backend.temperature;
        settings.timeout = backend.timeout_secs.map(Duration::from_secs);
        if let Some(max_tokens) = backend.max_tokens {
            settings.max_tokens = max_tokens;
        }

        let provider = ProviderSettings {
            transport: self.provider.transport.unwrap_or_default(),
            command: self.provider.command,
            args: self.provider.args.unwrap_or_default(),
            env: self.provider.env.unwrap_or_default(),
            url: self.provider.url,
            call_timeout: self.provider.call_timeout_secs.map(Duration::from_secs),
        };
        if provider.transport == Transport::Http && provider.url.is_none() {
            return Err(ConfigError::Invalid(
                "provider.url is required for the http transport".to_string(),
            ));
        }

        let session = SessionSettings {
            max_rounds: self.session.max_rounds.unwrap_or(10),
            concurrent_tool_calls: self.session.concurrent_tool_calls.unwrap_or(false),
            display_truncate: self.session.display_truncate.unwrap_or(200),
            tools: self.session.tools.unwrap_or_default(),
        };
        if session.max_rounds == 0 {
            return Err(ConfigError::Invalid(
                "session.max_rounds must be at least 1".to_string(),
            ));
        }

        Ok(BridgeConfig {
            backend: settings,
            provider,
            session,
        })
    }
}

/// Model used when none is configured
pub fn default_model(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::OpenAi => "gpt-4o-mini",
        BackendKind::Anthropic | BackendKind::Genai => "claude-sonnet-4-20250514",
        BackendKind::Gemini => "gemini-2.5-flash",
        BackendKind::Mock => "echo",
    }
}

/// Resolved tool provider settings
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub transport: Transport,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub url: Option<String>,
    pub call_timeout: Option<Duration>,
}

/// Resolved session settings
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub max_rounds: usize,
    pub concurrent_tool_calls: bool,
    /// Characters of tool output shown by the CLI
    pub display_truncate: usize,
    pub tools: ToolFilter,
}

impl SessionSettings {
    /// Loop limits for these settings
    pub fn loop_config(&self, backend_timeout: Option<Duration>) -> LoopConfig {
        LoopConfig {
            max_rounds: self.max_rounds,
            backend_timeout,
        }
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub backend: BackendSettings,
    pub provider: ProviderSettings,
    pub session: SessionSettings,
}
