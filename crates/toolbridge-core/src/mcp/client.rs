//! MCP client using the official rmcp SDK

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rmcp::{
    ServiceExt, ServiceError,
    model::{
        CallToolRequestParams, CallToolResult, ClientCapabilities, ClientInfo, Implementation,
        RawContent, Tool as McpTool,
    },
    service::{Peer, RunningService},
    transport::TokioChildProcess,
    RoleClient,
};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;

use crate::logging::Logger;
use crate::provider::{ContentItem, ProviderError, ProviderResult, ToolCallOutput, ToolProvider};
use crate::types::{Tool, ToolArguments};

/// Connection-time MCP errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type McpResult<T> = Result<T, McpError>;

impl From<McpError> for ProviderError {
    fn from(err: McpError) -> Self {
        ProviderError::Unavailable(err.to_string())
    }
}

/// MCP client connected to a single tool provider
///
/// The handshake completes inside the `connect_*` constructors, so a live
/// `McpClient` is always initialized. Calls go through a cloned `Peer`, which
/// lets several requests be in flight at once.
pub struct McpClient {
    peer: Peer<RoleClient>,
    /// Owning handle; taken on shutdown
    service: Mutex<Option<RunningService<RoleClient, ClientInfo>>>,
    connected: AtomicBool,
    server_name: String,
    logger: Arc<dyn Logger>,
}

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "toolbridge".to_string(),
            title: Some("ToolBridge".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            website_url: None,
            icons: None,
        },
    }
}

impl McpClient {
    /// Spawn the tool provider and connect over its stdio
    pub async fn connect_child_process(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        logger: Arc<dyn Logger>,
    ) -> McpResult<Self> {
        logger.info(&format!("[McpClient] Spawning {} {:?}", command, args));

        let mut cmd = Command::new(command);
        cmd.args(args).envs(env);

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| McpError::ConnectionFailed(format!("failed to spawn {}: {}", command, e)))?;

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::from_service(service, logger))
    }

    /// Connect to an MCP server over HTTP (Streamable HTTP transport)
    pub async fn connect_http(url: &str, logger: Arc<dyn Logger>) -> McpResult<Self> {
        use rmcp::transport::StreamableHttpClientTransport;

        logger.info(&format!("[McpClient] Connecting to HTTP: {}", url));

        let transport = StreamableHttpClientTransport::from_uri(url);

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::InitializationFailed(e.to_string()))?;

        Ok(Self::from_service(service, logger))
    }

    fn from_service(service: RunningService<RoleClient, ClientInfo>, logger: Arc<dyn Logger>) -> Self {
        let server_name = service
            .peer_info()
            .map(|info| info.server_info.name.clone())
            .unwrap_or_else(|| "mcp".to_string());
        let peer = service.peer().clone();

        logger.info(&format!(
            "[McpClient] Connected and initialized with server '{}'",
            server_name
        ));

        Self {
            peer,
            service: Mutex::new(Some(service)),
            connected: AtomicBool::new(true),
            server_name,
            logger,
        }
    }

    /// Map an rmcp service error, marking the connection dead when the
    /// transport is gone
    fn classify(&self, err: ServiceError) -> ProviderError {
        match err {
            ServiceError::McpError(data) => ProviderError::ToolFailed(data.message.to_string()),
            other => {
                self.connected.store(false, Ordering::SeqCst);
                self.logger.error(&format!("[McpClient] Transport failure: {}", other));
                ProviderError::Unavailable(other.to_string())
            }
        }
    }

    fn ensure_connected(&self) -> ProviderResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ProviderError::unavailable(format!(
                "connection to '{}' is closed",
                self.server_name
            )))
        }
    }
}

/// Convert an rmcp tool into the crate's tool type
pub(crate) fn from_mcp_tool(tool: McpTool) -> Tool {
    Tool {
        name: tool.name.to_string(),
        description: tool.description.map(|s| s.to_string()).unwrap_or_default(),
        parameter_schema: Value::Object(tool.input_schema.as_ref().clone()),
    }
}

/// Convert an rmcp call result into raw tool output
pub(crate) fn from_call_result(result: CallToolResult) -> ToolCallOutput {
    let content = result
        .content
        .iter()
        .map(|c| match &c.raw {
            RawContent::Text(t) => ContentItem::Text(t.text.clone()),
            other => ContentItem::Other(serde_json::to_value(other).unwrap_or(Value::Null)),
        })
        .collect();

    ToolCallOutput {
        content,
        structured: result.structured_content,
        is_error: result.is_error.unwrap_or(false),
    }
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        &self.server_name
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn supports_concurrent_calls(&self) -> bool {
        true
    }

    async fn list_tools(&self) -> ProviderResult<Vec<Tool>> {
        self.ensure_connected()?;

        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| self.classify(e))?;

        self.logger.info(&format!("[McpClient] Listed {} tools", tools.len()));

        Ok(tools.into_iter().map(from_mcp_tool).collect())
    }

    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> ProviderResult<ToolCallOutput> {
        self.ensure_connected()?;
        self.logger.info(&format!("[McpClient] Calling tool: {}", name));

        let params = CallToolRequestParams {
            meta: None,
            name: name.to_owned().into(),
            arguments: Some(arguments),
            task: None,
        };

        let result = self
            .peer
            .call_tool(params)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(from_call_result(result))
    }

    async fn shutdown(&self) -> ProviderResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        let service = self.service.lock().take();

        if let Some(service) = service {
            self.logger.info("[McpClient] Closing connection");
            service
                .cancel()
                .await
                .map_err(|e| ProviderError::Unavailable(format!("shutdown failed: {}", e)))?;
        }
        Ok(())
    }
}
