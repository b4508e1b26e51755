//! The orchestration loop

use std::sync::Arc;

use crate::backends::{AssistantReply, Backend, BackendError};
use crate::conversation::ConversationState;
use crate::logging::Logger;
use crate::tools::{InvokeError, ToolCatalog, ToolInvoker};
use crate::types::ToolInvocationRequest;
use super::error::{OrchestrationError, OrchestrationResult};
use super::state::{Exchange, LoopConfig, LoopState, ToolActivity};

/// Drives backend rounds and tool batches for one session
pub struct OrchestrationLoop {
    backend: Arc<dyn Backend>,
    invoker: ToolInvoker,
    conversation: ConversationState,
    config: LoopConfig,
    state: LoopState,
    logger: Arc<dyn Logger>,
}

impl OrchestrationLoop {
    pub fn new(
        backend: Arc<dyn Backend>,
        invoker: ToolInvoker,
        config: LoopConfig,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            backend,
            invoker,
            conversation: ConversationState::new(),
            config,
            state: LoopState::AwaitingUserInput,
            logger,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == LoopState::Closed
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        self.invoker.catalog()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Clear the transcript
    pub fn reset(&mut self) -> OrchestrationResult<()> {
        if self.is_closed() {
            return Err(OrchestrationError::Closed);
        }
        self.conversation.reset();
        self.logger.info("[OrchestrationLoop] Transcript cleared");
        Ok(())
    }

    /// Process one user message until the backend stops requesting tools
    pub async fn submit(&mut self, text: &str) -> OrchestrationResult<Exchange> {
        if self.is_closed() {
            return Err(OrchestrationError::Closed);
        }

        self.conversation.append_user(text)?;

        let mut texts: Vec<String> = Vec::new();
        let mut activity = Vec::new();
        let mut rounds = 0;

        loop {
            if rounds >= self.config.max_rounds {
                self.state = LoopState::AwaitingUserInput;
                self.logger.warn(&format!(
                    "[OrchestrationLoop] Round limit {} reached",
                    self.config.max_rounds
                ));
                return Err(OrchestrationError::MaxRoundsExceeded {
                    rounds,
                    text: texts.join("\n"),
                });
            }

            rounds += 1;
            self.state = LoopState::SentToBackend;
            let reply = match self.call_backend(rounds).await {
                Ok(reply) => reply,
                Err(source) => {
                    self.state = LoopState::AwaitingUserInput;
                    self.logger.error(&format!(
                        "[OrchestrationLoop] Backend {} failed in round {}: {}",
                        self.backend.name(),
                        rounds,
                        source
                    ));
                    if let Some(partial) = source.partial_text() {
                        texts.push(partial.to_string());
                    }
                    return Err(OrchestrationError::BackendUnavailable {
                        partial_text: texts.join("\n"),
                        source,
                    });
                }
            };

            if !reply.text.trim().is_empty() {
                texts.push(reply.text.clone());
            }

            if !reply.requests_tools() {
                self.state = LoopState::AssistantFinal;
                self.conversation.append_assistant(reply.text, Vec::new())?;
                self.state = LoopState::AwaitingUserInput;
                return Ok(Exchange {
                    text: texts.join("\n"),
                    rounds,
                    tool_activity: activity,
                });
            }

            self.state = LoopState::AssistantRequestedTools;
            let requests = self.rekey_call_ids(reply.tool_calls);
            self.conversation.append_assistant(reply.text, requests.clone())?;

            self.state = LoopState::Invoking;
            let results = match self.invoker.invoke_batch(&requests).await {
                Ok(results) => results,
                Err(e) => {
                    let message = match e {
                        InvokeError::ProviderUnavailable(message) => message,
                        // batches report unknown tools as failed results
                        InvokeError::UnknownTool(name) => format!("unexpected unknown tool '{}'", name),
                    };
                    self.close(&message).await;
                    return Err(OrchestrationError::ProviderUnavailable(message));
                }
            };

            for (request, result) in requests.into_iter().zip(results) {
                self.conversation.append_tool_result(&result)?;
                activity.push(ToolActivity { request, result });
            }
        }
    }

    async fn call_backend(&self, round: usize) -> Result<AssistantReply, BackendError> {
        let declarations = self.invoker.catalog().declarations();
        self.logger.debug(&format!(
            "[OrchestrationLoop] Round {}: {} turns, {} tools",
            round,
            self.conversation.len(),
            declarations.declarations.len()
        ));

        let call = self
            .backend
            .complete(self.conversation.turns(), &declarations.declarations);
        match self.config.backend_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or_else(|_| {
                    Err(BackendError::Timeout {
                        backend: self.backend.name().to_string(),
                        after: limit,
                    })
                }),
            None => call.await,
        }
    }

    /// Give missing or reused call ids a fresh value so every result pairs
    /// with exactly one request
    fn rekey_call_ids(&self, requests: Vec<ToolInvocationRequest>) -> Vec<ToolInvocationRequest> {
        let mut seen = std::collections::HashSet::new();
        requests
            .into_iter()
            .enumerate()
            .map(|(i, mut request)| {
                if request.call_id.is_empty()
                    || self.conversation.is_call_id_used(&request.call_id)
                    || !seen.insert(request.call_id.clone())
                {
                    let mut n = 0;
                    let mut fresh = format!("call_{}_{}", self.conversation.len(), i);
                    while self.conversation.is_call_id_used(&fresh) || seen.contains(&fresh) {
                        n += 1;
                        fresh = format!("call_{}_{}_{}", self.conversation.len(), i, n);
                    }
                    self.logger.debug(&format!(
                        "[OrchestrationLoop] Re-keying call id '{}' as '{}'",
                        request.call_id, fresh
                    ));
                    request.call_id = fresh.clone();
                    seen.insert(fresh);
                }
                request
            })
            .collect()
    }

    /// Enter the terminal state and tear the provider down
    async fn close(&mut self, reason: &str) {
        self.state = LoopState::Closed;
        self.logger.error(&format!("[OrchestrationLoop] Closing session: {}", reason));

        let provider = self.invoker.catalog().provider().clone();
        if let Err(e) = provider.shutdown().await {
            self.logger.warn(&format!(
                "[OrchestrationLoop] Provider shutdown failed: {}",
                e
            ));
        }
    }
}
