//! Tool provider trait definition

use async_trait::async_trait;
use serde_json::Value;

use crate::types::{Tool, ToolArguments};
use super::error::ProviderResult;

/// One piece of content returned by a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    /// Plain text content
    Text(String),
    /// Any non-text content (images, resources, ...), kept as JSON
    Other(Value),
}

/// Raw output of a tool call, before normalization by the invoker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolCallOutput {
    /// Content items in provider order
    pub content: Vec<ContentItem>,
    /// Structured content, if the provider sent one
    pub structured: Option<Value>,
    /// Whether the provider flagged the call as failed
    pub is_error: bool,
}

impl ToolCallOutput {
    /// Output made of a single text item
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::Text(text.into())],
            structured: None,
            is_error: false,
        }
    }

    /// Output flagged as a tool error
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Render the content as text: text items verbatim, others as JSON,
    /// joined with newlines
    pub fn render_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ContentItem::Text(text) => text.clone(),
                ContentItem::Other(value) => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Connection to a process exposing callable tools
///
/// Implementations must report a lost or never-established connection as
/// `ProviderError::Unavailable` and a failed call as `ProviderError::ToolFailed`
/// or an output with `is_error` set.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider name, for logging
    fn name(&self) -> &str;

    /// Whether the connection is established and the handshake completed
    fn is_connected(&self) -> bool;

    /// Whether several calls may be in flight at once
    fn supports_concurrent_calls(&self) -> bool {
        false
    }

    /// List the tools the provider advertises
    async fn list_tools(&self) -> ProviderResult<Vec<Tool>>;

    /// Call a tool by name
    async fn call_tool(&self, name: &str, arguments: ToolArguments) -> ProviderResult<ToolCallOutput>;

    /// Tear down the connection
    async fn shutdown(&self) -> ProviderResult<()>;
}
