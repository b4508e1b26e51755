//! Backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use crate::schema::ToolDeclaration;
use crate::types::{BackendKind, ToolInvocationRequest, Turn};
use super::error::BackendResult;

/// Connection settings for a backend
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Model identifier as used by the backend's API
    pub model: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Custom API base URL
    pub api_base: Option<String>,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    /// Sent ahead of the transcript on every request
    pub system_prompt: Option<String>,
    /// HTTP request timeout
    pub timeout: Option<Duration>,
}

impl BackendSettings {
    /// Create settings with defaults for a backend kind and model
    pub fn new(kind: BackendKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            api_key: None,
            api_base: None,
            max_tokens: 1000,
            temperature: None,
            system_prompt: None,
            timeout: None,
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// API base URL without trailing slash, falling back to `default`
    pub fn base_url(&self, default: &str) -> String {
        self.api_base
            .as_deref()
            .unwrap_or(default)
            .trim_end_matches('/')
            .to_string()
    }
}

/// One assistant reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssistantReply {
    /// Text segments joined with newlines; may be empty
    pub text: String,
    /// Tool invocations requested, in the order the backend listed them
    pub tool_calls: Vec<ToolInvocationRequest>,
}

impl AssistantReply {
    /// Reply carrying only text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Reply requesting tool invocations
    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Self {
            text: text.into(),
            tool_calls,
        }
    }

    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// LLM chat endpoint able to request tool invocations
///
/// Each implementation speaks one calling convention and expects the
/// declarations produced by the matching `SchemaAdapter`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name, for logging
    fn name(&self) -> &str;

    /// Calling convention of this backend
    fn kind(&self) -> BackendKind;

    /// Send the full transcript and tool declarations, returning one reply
    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply>;
}

/// Fills in call ids for backends that omit them
#[derive(Debug)]
pub(crate) struct CallIdSequence {
    prefix: &'static str,
    next: std::sync::atomic::AtomicU64,
}

impl CallIdSequence {
    pub(crate) const fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            next: std::sync::atomic::AtomicU64::new(1),
        }
    }

    /// Keep a backend-assigned id, or generate one
    pub(crate) fn fill(&self, id: Option<String>) -> String {
        match id {
            Some(id) if !id.is_empty() => id,
            _ => {
                let n = self.next.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                format!("{}_{}", self.prefix, n)
            }
        }
    }
}
