//! Scripted backend for testing
//!
//! Plays back queued replies in order and records every request it receives.
//! Once the script runs out it echoes the last user message.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::logging::Logger;
use crate::schema::ToolDeclaration;
use crate::types::{BackendKind, ToolArguments, ToolInvocationRequest, Turn};
use super::error::{BackendError, BackendResult};
use super::traits::{AssistantReply, Backend};

/// One scripted step
#[derive(Debug)]
pub enum ScriptStep {
    /// Answer with this reply
    Reply(AssistantReply),
    /// Fail the request
    Fail(BackendError),
    /// Wait, then play the inner step
    Delayed(Duration, Box<ScriptStep>),
}

/// What the backend saw on one request
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub transcript: Vec<Turn>,
    /// Names of the declared tools
    pub tools: Vec<String>,
}

/// Backend replaying a fixed script
pub struct ScriptedBackend {
    kind: BackendKind,
    script: Mutex<VecDeque<ScriptStep>>,
    requests: Mutex<Vec<RecordedRequest>>,
    logger: Arc<dyn Logger>,
}

impl ScriptedBackend {
    /// Create an empty script; the backend echoes until steps are queued
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            kind: BackendKind::Mock,
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            logger,
        }
    }

    /// Queue a step
    pub fn then(self, step: ScriptStep) -> Self {
        self.script.lock().push_back(step);
        self
    }

    /// Queue a text-only reply
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.then(ScriptStep::Reply(AssistantReply::text(text)))
    }

    /// Queue a reply requesting one tool call
    pub fn then_tool_call(
        self,
        text: impl Into<String>,
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: ToolArguments,
    ) -> Self {
        self.then(ScriptStep::Reply(AssistantReply::with_tool_calls(
            text,
            vec![ToolInvocationRequest::new(call_id, tool_name, arguments)],
        )))
    }

    /// Queue a failure
    pub fn then_fail(self, error: BackendError) -> Self {
        self.then(ScriptStep::Fail(error))
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Steps not yet played
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

fn echo(transcript: &[Turn]) -> AssistantReply {
    let last_user = transcript
        .iter()
        .rev()
        .find_map(|turn| match turn {
            Turn::User { text } => Some(text.as_str()),
            _ => None,
        })
        .unwrap_or_default();
    AssistantReply::text(format!("Echo: {}", last_user))
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply> {
        self.requests.lock().push(RecordedRequest {
            transcript: transcript.to_vec(),
            tools: tools.iter().map(|d| d.name.clone()).collect(),
        });

        let step = self.script.lock().pop_front();
        let mut step = match step {
            Some(step) => step,
            None => {
                self.logger.debug("[ScriptedBackend] Script exhausted, echoing");
                return Ok(echo(transcript));
            }
        };

        loop {
            match step {
                ScriptStep::Reply(reply) => return Ok(reply),
                ScriptStep::Fail(error) => return Err(error),
                ScriptStep::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    step = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[tokio::test]
    async fn test_plays_script_then_echoes() {
        let backend = ScriptedBackend::new(Arc::new(NoOpLogger::new())).then_text("scripted");
        let transcript = vec![Turn::user("hello")];

        let first = backend.complete(&transcript, &[]).await.unwrap();
        let second = backend.complete(&transcript, &[]).await.unwrap();

        assert_eq!(first.text, "scripted");
        assert_eq!(second.text, "Echo: hello");
        assert_eq!(backend.call_count(), 2);
        assert_eq!(backend.remaining(), 0);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let backend = ScriptedBackend::new(Arc::new(NoOpLogger::new()))
            .then_fail(BackendError::api("mock", 503, "overloaded"));

        let err = backend.complete(&[Turn::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 503, .. }));
    }
}
