//! Tool provider abstraction
//!
//! The orchestration core only needs request/response semantics from the
//! process exposing tools: `list_tools`, `call_tool` and a clear
//! "provider unavailable" signal. The MCP implementation lives in
//! [`crate::mcp`]; `MockToolProvider` is kept for testing.

mod traits;
mod error;
mod mock;

pub use traits::{ToolProvider, ToolCallOutput, ContentItem};
pub use error::{ProviderError, ProviderResult};
pub use mock::{MockToolProvider, MockBehavior};
