//! ToolBridge Core
//!
//! Lets an LLM chat backend call tools exposed by an MCP tool provider.
//! This crate holds the orchestration core; the line-mode client lives in
//! `toolbridge-cli`.
//!
//! ## Tool Orchestration
//!
//! - `ToolCatalog` discovers and caches the provider's tools
//! - `SchemaAdapter` turns each tool into the backend's declaration shape
//! - `ToolInvoker` runs requested calls and normalizes their output
//! - `ConversationState` keeps the transcript replayed on every round
//! - `OrchestrationLoop` drives rounds until the backend stops asking for tools
//!
//! ```rust,ignore
//! use toolbridge_core::{ConsoleLogger, ConfigFile, Session};
//!
//! let config = ConfigFile::default().resolve(|name| std::env::var(name).ok())?;
//! let mut session = Session::connect(&config, Arc::new(ConsoleLogger::new())).await?;
//!
//! let exchange = session.submit("What are the weather alerts in California?").await?;
//! println!("{}", exchange.text);
//!
//! session.shutdown().await?;
//! ```

pub mod types;
pub mod logging;
pub mod config;
pub mod provider;
pub mod mcp;
pub mod schema;
pub mod tools;
pub mod conversation;
pub mod backends;
pub mod orchestrator;
pub mod session;

// Re-export commonly used types
pub use types::{
    BackendKind, Tool, ToolArguments, ToolInvocationRequest, ToolInvocationResult, Turn,
};

pub use logging::{Logger, NoOpLogger, ConsoleLogger, LogLevel};

pub use config::{
    BridgeConfig, ConfigError, ConfigFile, ConfigProvider, FileConfigProvider,
    MemoryConfigProvider, Transport,
};

pub use provider::{ToolProvider, ToolCallOutput, ProviderError, MockToolProvider};

pub use schema::{adapter_for, SchemaAdapter, SchemaTranslationError, ToolDeclaration};

pub use tools::{ToolCatalog, ToolFilter, ToolInvoker, CatalogError, InvokeError};

pub use conversation::{ConversationState, TranscriptError};

pub use backends::{create_backend, AssistantReply, Backend, BackendError, BackendSettings};

pub use orchestrator::{Exchange, LoopConfig, LoopState, OrchestrationError, OrchestrationLoop};

pub use session::{Session, SessionError, SessionResult};

// MCP client using official rmcp SDK
pub use mcp::{McpClient, McpError, McpResult};
