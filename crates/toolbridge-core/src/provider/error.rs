//! Tool provider error types

use thiserror::Error;

/// Errors reported by a tool provider connection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The connection is gone, was never established, or timed out
    #[error("Tool provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered, but the tool call itself failed
    #[error("Tool call failed: {0}")]
    ToolFailed(String),
}

impl ProviderError {
    /// Create an unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a tool failure error
    pub fn tool_failed(message: impl Into<String>) -> Self {
        Self::ToolFailed(message.into())
    }

    /// Whether the error means the connection cannot be used any more
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
