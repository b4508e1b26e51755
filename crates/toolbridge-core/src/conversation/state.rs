//! Append-only transcript with tool-result pairing checks

use std::collections::{HashSet, VecDeque};

use thiserror::Error;

use crate::types::{ToolInvocationRequest, ToolInvocationResult, Turn};

/// Rejected transcript appends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranscriptError {
    /// A user or assistant turn was appended while tool results are owed
    #[error("Tool results still pending for: {}", .0.join(", "))]
    ResultsPending(Vec<String>),

    /// A tool result answers no outstanding request
    #[error("No pending tool request with call id '{0}'")]
    UnexpectedResult(String),

    /// A tool result arrived ahead of an earlier request's result
    #[error("Tool result out of order: expected '{expected}', got '{found}'")]
    OutOfOrder { expected: String, found: String },

    /// A requested call id was already used in this transcript
    #[error("Duplicate call id '{0}'")]
    DuplicateCallId(String),

    /// A request carried an empty call id
    #[error("Tool request for '{0}' has an empty call id")]
    EmptyCallId(String),
}

pub type TranscriptResult<T> = Result<T, TranscriptError>;

/// Ordered turns of one session
///
/// Every `ToolResult` answers exactly one earlier assistant request, and the
/// results of an assistant turn follow it in request order.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
    /// Call ids of the last assistant turn still waiting for a result
    pending: VecDeque<String>,
    /// Every call id requested so far
    requested: HashSet<String>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// All turns in order
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Call ids still waiting for a result, in request order
    pub fn pending_results(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    /// Whether a call id was already requested in this transcript
    pub fn is_call_id_used(&self, call_id: &str) -> bool {
        self.requested.contains(call_id)
    }

    /// Append a user turn
    pub fn append_user(&mut self, text: impl Into<String>) -> TranscriptResult<()> {
        self.ensure_nothing_pending()?;
        self.turns.push(Turn::user(text));
        Ok(())
    }

    /// Append an assistant turn; its requests become pending
    pub fn append_assistant(
        &mut self,
        text: impl Into<String>,
        tool_calls: Vec<ToolInvocationRequest>,
    ) -> TranscriptResult<()> {
        self.ensure_nothing_pending()?;

        let mut batch = HashSet::new();
        for call in &tool_calls {
            if call.call_id.is_empty() {
                return Err(TranscriptError::EmptyCallId(call.tool_name.clone()));
            }
            if self.requested.contains(&call.call_id) || !batch.insert(call.call_id.as_str()) {
                return Err(TranscriptError::DuplicateCallId(call.call_id.clone()));
            }
        }

        for call in &tool_calls {
            self.requested.insert(call.call_id.clone());
            self.pending.push_back(call.call_id.clone());
        }
        self.turns.push(Turn::assistant(text, tool_calls));
        Ok(())
    }

    /// Append the result of the next pending request
    pub fn append_tool_result(&mut self, result: &ToolInvocationResult) -> TranscriptResult<()> {
        match self.pending.front() {
            Some(expected) if *expected == result.call_id => {}
            Some(expected) if self.pending.contains(&result.call_id) => {
                return Err(TranscriptError::OutOfOrder {
                    expected: expected.clone(),
                    found: result.call_id.clone(),
                })
            }
            _ => return Err(TranscriptError::UnexpectedResult(result.call_id.clone())),
        }

        self.pending.pop_front();
        self.turns.push(Turn::tool_result(result));
        Ok(())
    }

    /// Drop every turn and start over
    pub fn reset(&mut self) {
        self.turns.clear();
        self.pending.clear();
        self.requested.clear();
    }

    fn ensure_nothing_pending(&self) -> TranscriptResult<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(TranscriptError::ResultsPending(self.pending_results()))
        }
    }
}
