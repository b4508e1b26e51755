//! Session: scoped owner of the provider connection, catalog and loop
//!
//! The provider is acquired in `connect`/`start` and released by `shutdown`,
//! which is idempotent. `scoped` runs a body against the session and shuts
//! the provider down afterwards whatever the body returned.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::backends::{create_backend, Backend, BackendError};
use crate::config::{BridgeConfig, SessionSettings, Transport};
use crate::logging::Logger;
use crate::mcp::McpClient;
use crate::orchestrator::{Exchange, OrchestrationLoop, OrchestrationResult};
use crate::provider::{ProviderError, ToolProvider};
use crate::schema::adapter_for;
use crate::tools::{CatalogError, ToolCatalog, ToolInvoker};
use crate::types::Tool;
use crate::{log_info, log_warn};

/// Errors raised while opening or closing a session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Configuration cannot describe a provider connection
    #[error("Invalid session configuration: {0}")]
    Invalid(String),

    #[error("Tool provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<ProviderError> for SessionError {
    fn from(err: ProviderError) -> Self {
        SessionError::ProviderUnavailable(err.to_string())
    }
}

impl From<CatalogError> for SessionError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ProviderUnavailable(message) => SessionError::ProviderUnavailable(message),
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One provider connection, one backend, one transcript
pub struct Session {
    orchestrator: OrchestrationLoop,
    provider: Arc<dyn ToolProvider>,
    released: bool,
    logger: Arc<dyn Logger>,
}

impl Session {
    /// Create the backend, connect to the tool provider and list its tools
    pub async fn connect(config: &BridgeConfig, logger: Arc<dyn Logger>) -> SessionResult<Self> {
        let backend: Arc<dyn Backend> = Arc::from(create_backend(config.backend.clone(), logger.clone())?);

        let provider: Arc<dyn ToolProvider> = match config.provider.transport {
            Transport::Stdio => {
                let command = config.provider.command.as_deref().ok_or_else(|| {
                    SessionError::Invalid("stdio transport needs a provider command".to_string())
                })?;
                let client = McpClient::connect_child_process(
                    command,
                    &config.provider.args,
                    &config.provider.env,
                    logger.clone(),
                )
                .await
                .map_err(ProviderError::from)?;
                Arc::new(client)
            }
            Transport::Http => {
                let url = config.provider.url.as_deref().ok_or_else(|| {
                    SessionError::Invalid("http transport needs a provider url".to_string())
                })?;
                let client = McpClient::connect_http(url, logger.clone())
                    .await
                    .map_err(ProviderError::from)?;
                Arc::new(client)
            }
        };

        Self::start(
            provider,
            backend,
            &config.session,
            config.provider.call_timeout,
            config.backend.timeout,
            logger,
        )
        .await
    }

    /// Build a session on an already connected provider
    ///
    /// The provider is shut down if the initial tool listing fails.
    pub async fn start(
        provider: Arc<dyn ToolProvider>,
        backend: Arc<dyn Backend>,
        settings: &SessionSettings,
        call_timeout: Option<Duration>,
        backend_timeout: Option<Duration>,
        logger: Arc<dyn Logger>,
    ) -> SessionResult<Self> {
        let catalog = Arc::new(
            ToolCatalog::new(provider.clone(), adapter_for(backend.kind()), logger.clone())
                .with_filter(settings.tools.clone()),
        );

        let tools = match catalog.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                logger.error(&format!("[Session] Initial tool listing failed: {}", e));
                if let Err(shutdown_err) = provider.shutdown().await {
                    logger.warn(&format!("[Session] Provider shutdown failed: {}", shutdown_err));
                }
                return Err(e.into());
            }
        };
        log_info!(
            logger,
            "[Session] Started with {} tools from {} using {}",
            tools.len(),
            provider.name(),
            backend.name()
        );

        let invoker = ToolInvoker::new(catalog, logger.clone())
            .with_timeout(call_timeout)
            .with_concurrency(settings.concurrent_tool_calls);
        let orchestrator = OrchestrationLoop::new(
            backend,
            invoker,
            settings.loop_config(backend_timeout),
            logger.clone(),
        );

        Ok(Self {
            orchestrator,
            provider,
            released: false,
            logger,
        })
    }

    /// Send one user message through the loop
    pub async fn submit(&mut self, text: &str) -> OrchestrationResult<Exchange> {
        let result = self.orchestrator.submit(text).await;
        if self.orchestrator.is_closed() {
            // the loop tore the provider down itself
            self.released = true;
        }
        result
    }

    /// Tools that pass the filter, in catalog order
    pub fn tools(&self) -> Vec<Tool> {
        self.orchestrator.catalog().available_tools()
    }

    /// Re-list the provider's tools
    pub async fn refresh_tools(&self) -> SessionResult<Vec<Tool>> {
        self.orchestrator.catalog().refresh().await?;
        Ok(self.tools())
    }

    /// Enable or disable one tool for the following rounds
    pub fn set_tool_enabled(&self, name: &str, enabled: bool) {
        self.orchestrator.catalog().set_tool_enabled(name, enabled);
    }

    /// Start a new transcript
    pub fn reset(&mut self) -> OrchestrationResult<()> {
        self.orchestrator.reset()
    }

    pub fn is_closed(&self) -> bool {
        self.released || self.orchestrator.is_closed()
    }

    pub fn orchestrator(&self) -> &OrchestrationLoop {
        &self.orchestrator
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        self.orchestrator.catalog()
    }

    /// Release the provider connection
    pub async fn shutdown(&mut self) -> SessionResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        log_info!(self.logger, "[Session] Shutting down {}", self.provider.name());
        self.provider.shutdown().await?;
        Ok(())
    }

    /// Run `body` against the session, then shut the provider down
    pub async fn scoped<T, F>(mut self, body: F) -> T
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, T>,
    {
        let output = body(&mut self).await;
        if let Err(e) = self.shutdown().await {
            log_warn!(self.logger, "[Session] Shutdown failed: {}", e);
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ScriptedBackend;
    use crate::logging::NoOpLogger;
    use crate::orchestrator::OrchestrationError;
    use crate::provider::{MockBehavior, MockToolProvider};
    use crate::tools::ToolFilter;
    use futures::FutureExt;
    use serde_json::json;

    fn settings() -> SessionSettings {
        SessionSettings {
            max_rounds: 10,
            concurrent_tool_calls: false,
            display_truncate: 200,
            tools: ToolFilter::default(),
        }
    }

    fn tools() -> Vec<Tool> {
        vec![
            Tool::new("get_alerts", "Get weather alerts for a US state"),
            Tool::new("get_forecast", "Get weather forecast for a location"),
        ]
    }

    async fn session(provider: Arc<MockToolProvider>, backend: ScriptedBackend) -> SessionResult<Session> {
        let logger = Arc::new(NoOpLogger::new());
        Session::start(provider, Arc::new(backend), &settings(), None, None, logger).await
    }

    #[tokio::test]
    async fn test_start_lists_tools() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        let session = session(provider.clone(), ScriptedBackend::new(logger)).await.unwrap();

        assert_eq!(provider.list_count(), 1);
        let names: Vec<String> = session.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_alerts", "get_forecast"]);
    }

    #[tokio::test]
    async fn test_failed_listing_releases_provider() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        provider.set_listing_fails(true);

        let err = session(provider.clone(), ScriptedBackend::new(logger)).await.err().unwrap();

        assert!(matches!(err, SessionError::ProviderUnavailable(_)));
        assert!(!provider.is_connected());
    }

    #[tokio::test]
    async fn test_scoped_shuts_down_after_body() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        let backend = ScriptedBackend::new(logger).then_text("hello");
        let session = session(provider.clone(), backend).await.unwrap();

        let text = session
            .scoped(|s| async move { s.submit("hi").await.map(|e| e.text) }.boxed())
            .await
            .unwrap();

        assert_eq!(text, "hello");
        assert!(!provider.is_connected());
    }

    #[tokio::test]
    async fn test_fatal_error_marks_session_closed() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(
            MockToolProvider::new(tools(), logger.clone()).with_behavior("get_alerts", MockBehavior::Disconnect),
        );
        let args = json!({ "state": "CA" }).as_object().cloned().unwrap();
        let backend = ScriptedBackend::new(logger).then_tool_call("", "call_1", "get_alerts", args);
        let mut session = session(provider.clone(), backend).await.unwrap();

        let err = session.submit("alerts?").await.unwrap_err();

        assert!(matches!(err, OrchestrationError::ProviderUnavailable(_)));
        assert!(session.is_closed());
        assert!(matches!(session.submit("again").await, Err(OrchestrationError::Closed)));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        let mut session = session(provider.clone(), ScriptedBackend::new(logger)).await.unwrap();

        session.shutdown().await.unwrap();
        session.shutdown().await.unwrap();

        assert!(session.is_closed());
        assert!(!provider.is_connected());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_new_tools() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        let session = session(provider.clone(), ScriptedBackend::new(logger)).await.unwrap();

        provider.set_tools(vec![Tool::new("get_time", "Current time")]);
        let refreshed = session.refresh_tools().await.unwrap();

        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].name, "get_time");
    }

    #[tokio::test]
    async fn test_disabled_tool_is_hidden() {
        let logger = Arc::new(NoOpLogger::new());
        let provider = Arc::new(MockToolProvider::new(tools(), logger.clone()));
        let session = session(provider, ScriptedBackend::new(logger)).await.unwrap();

        session.set_tool_enabled("get_forecast", false);

        let names: Vec<String> = session.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["get_alerts"]);
        assert!(session.catalog().lookup("get_forecast").is_none());

        session.set_tool_enabled("get_forecast", true);
        assert_eq!(session.tools().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_requires_command_for_stdio() {
        let mut config = crate::config::ConfigFile::default().resolve(|_| None).unwrap();
        config.backend.kind = crate::types::BackendKind::Mock;

        let err = Session::connect(&config, Arc::new(NoOpLogger::new())).await.err().unwrap();

        assert!(matches!(err, SessionError::Invalid(_)));
    }
}
