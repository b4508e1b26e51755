//! MCP (Model Context Protocol) client module
//!
//! Uses the official rmcp SDK to connect to the tool provider. Supports a
//! spawned child process talking over stdio, and the streamable HTTP
//! transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolbridge_core::mcp::McpClient;
//! use toolbridge_core::provider::ToolProvider;
//!
//! let client = McpClient::connect_child_process("python", &["weather.py".into()], &env, logger).await?;
//! let tools = client.list_tools().await?;
//! let output = client.call_tool("get_alerts", args).await?;
//! client.shutdown().await?;
//! ```

mod client;

pub use client::{McpClient, McpError, McpResult};
