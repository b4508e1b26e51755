//! Mock tool provider for testing
//!
//! Serves a fixed tool list and scripted per-tool behaviors without spawning
//! any process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ProviderError, ProviderResult};
use super::traits::{ToolCallOutput, ToolProvider};
use crate::logging::Logger;
use crate::types::{Tool, ToolArguments};

/// What the mock does when a tool is called
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Return text content
    Reply(String),
    /// Return content flagged with `is_error`
    ErrorResult(String),
    /// Fail the call with `ProviderError::ToolFailed`
    Fail(String),
    /// Drop the connection and fail with `ProviderError::Unavailable`
    Disconnect,
    /// Wait, then behave as the inner behavior
    Delayed(Duration, Box<MockBehavior>),
}

/// In-memory tool provider
pub struct MockToolProvider {
    tools: Mutex<Vec<Tool>>,
    behaviors: Mutex<HashMap<String, MockBehavior>>,
    calls: Mutex<Vec<(String, ToolArguments)>>,
    list_count: AtomicUsize,
    fail_listing: AtomicBool,
    connected: AtomicBool,
    concurrent: bool,
    logger: Arc<dyn Logger>,
}

impl MockToolProvider {
    /// Create a connected mock serving `tools`
    pub fn new(tools: Vec<Tool>, logger: Arc<dyn Logger>) -> Self {
        Self {
            tools: Mutex::new(tools),
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            list_count: AtomicUsize::new(0),
            fail_listing: AtomicBool::new(false),
            connected: AtomicBool::new(true),
            concurrent: false,
            logger,
        }
    }

    /// Set the behavior for a tool (tools without one echo their arguments)
    pub fn with_behavior(self, tool: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.lock().insert(tool.into(), behavior);
        self
    }

    /// Advertise support for concurrent in-flight calls
    pub fn with_concurrency(mut self) -> Self {
        self.concurrent = true;
        self
    }

    /// Replace the advertised tool list
    pub fn set_tools(&self, tools: Vec<Tool>) {
        *self.tools.lock() = tools;
    }

    /// Make subsequent `list_tools` calls fail with a transport error
    pub fn set_listing_fails(&self, fails: bool) {
        self.fail_listing.store(fails, Ordering::SeqCst);
    }

    /// Simulate the provider process going away
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Names and arguments of every call received, in arrival order
    pub fn calls(&self) -> Vec<(String, ToolArguments)> {
        self.calls.lock().clone()
    }

    /// Number of `list_tools` requests served or refused
    pub fn list_count(&self) -> usize {
        self.list_count.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> ProviderResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::unavailable("mock provider disconnected"))
        }
    }

    async fn run(&self, behavior: MockBehavior) -> ProviderResult<ToolCallOutput> {
        let mut behavior = behavior;
        loop {
            match behavior {
                MockBehavior::Reply(text) => return Ok(ToolCallOutput::text(text)),
                MockBehavior::ErrorResult(text) => return Ok(ToolCallOutput::error(text)),
                MockBehavior::Fail(message) => return Err(ProviderError::tool_failed(message)),
                MockBehavior::Disconnect => {
                    self.disconnect();
                    return Err(ProviderError::unavailable("connection closed mid-call"));
                }
                MockBehavior::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    self.ensure_connected()?;
                    behavior = *inner;
                }
            }
        }
    }
}

#[async_trait]
impl ToolProvider for MockToolProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn supports_concurrent_calls(&self) -> bool {
        self.concurrent
    }

    async fn list_tools(&self) -> ProviderResult<Vec<Tool>> {
        self.list_count.fetch_add(1, Ordering::SeqCst);
        self.ensure_connected()?;
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(ProviderError::unavailable("tools/list transport error"));
        }
        Ok(self.tools.lock().clone())
    }

    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> ProviderResult<ToolCallOutput> {
        self.ensure_connected()?;
        self.logger.debug(&format!("[MockToolProvider] call {}", name));
        self.calls.lock().push((name.to_string(), arguments.clone()));

        let behavior = self.behaviors.lock().get(name).cloned();
        match behavior {
            Some(behavior) => self.run(behavior).await,
            None => Ok(ToolCallOutput::text(format!(
                "{} called with {}",
                name,
                serde_json::Value::Object(arguments)
            ))),
        }
    }

    async fn shutdown(&self) -> ProviderResult<()> {
        self.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    fn provider() -> MockToolProvider {
        MockToolProvider::new(vec![Tool::new("echo", "Echo")], Arc::new(NoOpLogger::new()))
    }

    #[tokio::test]
    async fn test_default_behavior_echoes() {
        let provider = provider();
        let output = provider.call_tool("echo", ToolArguments::new()).await.unwrap();

        assert!(!output.is_error);
        assert!(output.render_text().starts_with("echo called with"));
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_behavior() {
        let provider = provider().with_behavior("echo", MockBehavior::Disconnect);

        let err = provider.call_tool("echo", ToolArguments::new()).await.unwrap_err();
        assert!(err.is_unavailable());
        assert!(!provider.is_connected());
        assert!(provider.list_tools().await.is_err());
    }

    #[tokio::test]
    async fn test_listing_failure_is_unavailable() {
        let provider = provider();
        provider.set_listing_fails(true);

        let err = provider.list_tools().await.unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(provider.list_count(), 1);
    }
}
