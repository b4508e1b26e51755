//! OpenAI-compatible chat completions backend
//!
//! Works against any server exposing `/chat/completions` with function
//! calling (OpenAI, Ollama, vLLM, OpenRouter, ...).

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::logging::Logger;
use crate::schema::ToolDeclaration;
use crate::types::{BackendKind, ToolInvocationRequest, Turn};
use super::error::{BackendError, BackendResult};
use super::http::{build_client, decode, require_api_key, send};
use super::traits::{AssistantReply, Backend, BackendSettings, CallIdSequence};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const NAME: &str = "openai";

// -- request/response wire types ---------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<&'a Value>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct MessagePayload {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCallPayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCallPayload {
    #[serde(default)]
    id: Option<String>,
    #[serde(default = "function_type")]
    r#type: String,
    function: FunctionCallPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCallPayload {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    /// Decoded one call at a time so a malformed call keeps `content`
    tool_calls: Option<Vec<Value>>,
}

/// Chat completions backend
pub struct OpenAiBackend {
    settings: BackendSettings,
    api_key: String,
    http: Client,
    call_ids: CallIdSequence,
    logger: Arc<dyn Logger>,
}

impl OpenAiBackend {
    pub fn new(settings: BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        let api_key = require_api_key(&settings)?;
        let http = build_client(&settings)?;
        Ok(Self {
            settings,
            api_key,
            http,
            call_ids: CallIdSequence::new("call"),
            logger,
        })
    }

    fn build_request<'a>(&'a self, transcript: &[Turn], tools: &'a [ToolDeclaration]) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);
        if let Some(system) = &self.settings.system_prompt {
            messages.push(MessagePayload {
                role: "system",
                content: Some(system.clone()),
                tool_calls: None,
                tool_call_id: None,
            });
        }
        messages.extend(transcript.iter().map(to_message));

        ChatRequest {
            model: &self.settings.model,
            messages,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(|d| &d.payload).collect())
            },
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        }
    }

    fn parse_response(&self, body: &str) -> BackendResult<AssistantReply> {
        let response: ChatResponse = decode(NAME, body)?;
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| BackendError::invalid_response(NAME, "response has no choices"))?;

        let text = message.content.unwrap_or_default();
        let mut tool_calls = Vec::new();
        for raw in message.tool_calls.unwrap_or_default() {
            let call: ToolCallPayload = match serde_json::from_value(raw) {
                Ok(call) => call,
                Err(e) => {
                    return Err(BackendError::unparsable(
                        NAME,
                        text,
                        format!("malformed tool call: {}", e),
                    ))
                }
            };
            let arguments = match parse_arguments(&call.function.arguments) {
                Ok(arguments) => arguments,
                Err(message) => {
                    return Err(BackendError::unparsable(
                        NAME,
                        text,
                        format!("tool call '{}': {}", call.function.name, message),
                    ))
                }
            };
            tool_calls.push(ToolInvocationRequest::new(
                self.call_ids.fill(call.id),
                call.function.name,
                arguments,
            ));
        }

        Ok(AssistantReply::with_tool_calls(text, tool_calls))
    }
}

fn to_message(turn: &Turn) -> MessagePayload {
    match turn {
        Turn::User { text } => MessagePayload {
            role: "user",
            content: Some(text.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Turn::Assistant { text, tool_calls } => MessagePayload {
            role: "assistant",
            content: if text.is_empty() && !tool_calls.is_empty() {
                None
            } else {
                Some(text.clone())
            },
            tool_calls: if tool_calls.is_empty() {
                None
            } else {
                Some(
                    tool_calls
                        .iter()
                        .map(|call| ToolCallPayload {
                            id: Some(call.call_id.clone()),
                            r#type: function_type(),
                            function: FunctionCallPayload {
                                name: call.tool_name.clone(),
                                arguments: call.arguments_value().to_string(),
                            },
                        })
                        .collect(),
                )
            },
            tool_call_id: None,
        },
        Turn::ToolResult { call_id, content, .. } => MessagePayload {
            role: "tool",
            content: Some(content.clone()),
            tool_calls: None,
            tool_call_id: Some(call_id.clone()),
        },
    }
}

/// Arguments arrive as a JSON-encoded string; empty means no arguments
fn parse_arguments(raw: &str) -> Result<crate::types::ToolArguments, String> {
    if raw.trim().is_empty() {
        return Ok(Default::default());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(other) => Err(format!("arguments are not an object: {}", other)),
        Err(e) => Err(format!("arguments are not valid JSON: {}", e)),
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply> {
        let url = format!("{}/chat/completions", self.settings.base_url(DEFAULT_API_BASE));
        let request = self.build_request(transcript, tools);

        self.logger.debug(&format!(
            "[OpenAiBackend] POST {} model={} messages={} tools={}",
            url,
            self.settings.model,
            request.messages.len(),
            tools.len()
        ));

        let body = send(
            NAME,
            self.http.post(&url).bearer_auth(&self.api_key).json(&request),
        )
        .await?;
        self.parse_response(&body)
    }
}
