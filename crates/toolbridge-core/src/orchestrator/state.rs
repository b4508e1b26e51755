//! Loop state and configuration

use std::fmt;
use std::time::Duration;

use crate::types::{ToolInvocationRequest, ToolInvocationResult};

/// Where the loop stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    SentToBackend,
    AssistantFinal,
    AssistantRequestedTools,
    Invoking,
    /// Terminal, after a fatal error
    Closed,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopState::AwaitingUserInput => "awaiting-user-input",
            LoopState::SentToBackend => "sent-to-backend",
            LoopState::AssistantFinal => "assistant-final",
            LoopState::AssistantRequestedTools => "assistant-requested-tools",
            LoopState::Invoking => "invoking",
            LoopState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Loop limits
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Backend calls allowed per user message
    pub max_rounds: usize,
    /// Per-call backend timeout
    pub backend_timeout: Option<Duration>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            backend_timeout: None,
        }
    }
}

/// One tool call made during an exchange
#[derive(Debug, Clone, PartialEq)]
pub struct ToolActivity {
    pub request: ToolInvocationRequest,
    pub result: ToolInvocationResult,
}

/// Outcome of one user message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Exchange {
    /// Non-empty assistant text segments, in round order, joined with newlines
    pub text: String,
    /// Backend calls made
    pub rounds: usize,
    /// Tool calls made, in order
    pub tool_activity: Vec<ToolActivity>,
}
