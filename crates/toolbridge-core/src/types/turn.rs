//! Conversation turn type

use serde::{Deserialize, Serialize};

use super::tool::{ToolInvocationRequest, ToolInvocationResult};

/// One entry of the transcript replayed to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Text typed by the user
    User { text: String },
    /// Assistant reply, possibly requesting tool invocations
    Assistant {
        text: String,
        #[serde(default, rename = "toolCalls", skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolInvocationRequest>,
    },
    /// Result of one requested tool invocation
    ToolResult {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        content: String,
        ok: bool,
    },
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>, tool_calls: Vec<ToolInvocationRequest>) -> Self {
        Turn::Assistant {
            text: text.into(),
            tool_calls,
        }
    }

    /// Create a tool-result turn from an invocation result
    ///
    /// A result with no text falls back to its structured payload, as JSON.
    pub fn tool_result(result: &ToolInvocationResult) -> Self {
        let content = match &result.structured {
            Some(structured) if result.content.trim().is_empty() => structured.to_string(),
            _ => result.content.clone(),
        };
        Turn::ToolResult {
            call_id: result.call_id.clone(),
            tool_name: result.tool_name.clone(),
            content,
            ok: result.ok,
        }
    }

    /// Tool requests carried by this turn (empty for non-assistant turns)
    pub fn tool_calls(&self) -> &[ToolInvocationRequest] {
        match self {
            Turn::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Text of a user or assistant turn
    pub fn text(&self) -> Option<&str> {
        match self {
            Turn::User { text } | Turn::Assistant { text, .. } => Some(text),
            Turn::ToolResult { .. } => None,
        }
    }
}
