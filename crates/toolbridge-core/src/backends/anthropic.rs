//! Anthropic messages API backend

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

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const NAME: &str = "anthropic";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<&'a Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: Vec<Block>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    stop_reason: Option<String>,
}

/// Messages API backend
pub struct AnthropicBackend {
    settings: BackendSettings,
    api_key: String,
    http: Client,
    call_ids: CallIdSequence,
    logger: Arc<dyn Logger>,
}

impl AnthropicBackend {
    pub fn new(settings: BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        let api_key = require_api_key(&settings)?;
        let http = build_client(&settings)?;
        Ok(Self {
            settings,
            api_key,
            http,
            call_ids: CallIdSequence::new("toolu"),
            logger,
        })
    }

    fn build_request<'a>(&'a self, transcript: &[Turn], tools: &'a [ToolDeclaration]) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            system: self.settings.system_prompt.as_deref(),
            messages: to_messages(transcript),
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(|d| &d.payload).collect())
            },
            temperature: self.settings.temperature,
        }
    }

    fn parse_response(&self, body: &str) -> BackendResult<AssistantReply> {
        let response: MessagesResponse = decode(NAME, body)?;
        if let Some(reason) = &response.stop_reason {
            self.logger.debug(&format!("[AnthropicBackend] stop_reason={}", reason));
        }

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for block in &response.content {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(Value::as_str) {
                        texts.push(text.to_string());
                    }
                }
                Some("tool_use") => {
                    let name = block.get("name").and_then(Value::as_str);
                    let input = block.get("input").and_then(Value::as_object);
                    match (name, input) {
                        (Some(name), Some(input)) => tool_calls.push(ToolInvocationRequest::new(
                            self.call_ids
                                .fill(block.get("id").and_then(Value::as_str).map(str::to_string)),
                            name,
                            input.clone(),
                        )),
                        _ => {
                            return Err(BackendError::unparsable(
                                NAME,
                                texts.join("\n"),
                                format!("malformed tool_use block: {}", block),
                            ))
                        }
                    }
                }
                other => {
                    self.logger.debug(&format!(
                        "[AnthropicBackend] Ignoring content block {:?}",
                        other
                    ));
                }
            }
        }

        Ok(AssistantReply::with_tool_calls(texts.join("\n"), tool_calls))
    }
}

/// Convert turns to messages, merging consecutive turns of the same role
///
/// Tool results travel as `tool_result` blocks in a user message, so the
/// results of one assistant turn end up in a single message.
fn to_messages(transcript: &[Turn]) -> Vec<Message> {
    let mut messages: Vec<Message> = Vec::new();

    for turn in transcript {
        let (role, blocks) = match turn {
            Turn::User { text } => ("user", vec![Block::Text { text: text.clone() }]),
            Turn::Assistant { text, tool_calls } => {
                let mut blocks = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    blocks.push(Block::Text { text: text.clone() });
                }
                blocks.extend(tool_calls.iter().map(|call| Block::ToolUse {
                    id: call.call_id.clone(),
                    name: call.tool_name.clone(),
                    input: call.arguments_value(),
                }));
                ("assistant", blocks)
            }
            Turn::ToolResult {
                call_id,
                content,
                ok,
                ..
            } => (
                "user",
                vec![Block::ToolResult {
                    tool_use_id: call_id.clone(),
                    content: content.clone(),
                    is_error: !ok,
                }],
            ),
        };

        if blocks.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(Message {
                role,
                content: blocks,
            }),
        }
    }

    messages
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply> {
        let url = format!("{}/v1/messages", self.settings.base_url(DEFAULT_API_BASE));
        let request = self.build_request(transcript, tools);

        self.logger.debug(&format!(
            "[AnthropicBackend] POST {} model={} messages={} tools={}",
            url,
            self.settings.model,
            request.messages.len(),
            tools.len()
        ));

        let body = send(
            NAME,
            self.http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", API_VERSION)
                .json(&request),
        )
        .await?;
        self.parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::types::{ToolArguments, ToolInvocationResult};
    use serde_json::json;

    fn backend() -> AnthropicBackend {
        AnthropicBackend::new(
            BackendSettings::new(BackendKind::Anthropic, "claude-sonnet-4-20250514")
                .with_api_key("test-key"),
            Arc::new(NoOpLogger::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_tool_results_share_one_user_message() {
        let transcript = vec![
            Turn::user("Weather in SF and alerts for CA?"),
            Turn::assistant(
                "Checking both.",
                vec![
                    ToolInvocationRequest::new("toolu_1", "get_forecast", ToolArguments::new()),
                    ToolInvocationRequest::new("toolu_2", "get_alerts", ToolArguments::new()),
                ],
            ),
            Turn::tool_result(&ToolInvocationResult::success("toolu_1", "get_forecast", "Sunny")),
            Turn::tool_result(&ToolInvocationResult::failure("toolu_2", "get_alerts", "NWS down")),
        ];

        let request = serde_json::to_value(backend().build_request(&transcript, &[])).unwrap();
        let messages = request["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["content"][0]["type"], "text");
        assert_eq!(messages[1]["content"][1]["type"], "tool_use");
        assert_eq!(messages[1]["content"][1]["input"], json!({}));
        let results = messages[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].get("is_error").is_none());
        assert_eq!(results[1]["is_error"], true);
    }

    #[test]
    fn test_parse_text_and_tool_use() {
        let body = json!({
            "content": [
                { "type": "text", "text": "I'll look that up." },
                { "type": "tool_use", "id": "toolu_01", "name": "get_alerts", "input": { "state": "CA" } }
            ],
            "stop_reason": "tool_use"
        })
        .to_string();

        let reply = backend().parse_response(&body).unwrap();
        assert_eq!(reply.text, "I'll look that up.");
        assert_eq!(reply.tool_calls[0].call_id, "toolu_01");
        assert_eq!(reply.tool_calls[0].arguments["state"], "CA");
    }

    #[test]
    fn test_malformed_tool_use_keeps_text() {
        let body = json!({
            "content": [
                { "type": "text", "text": "Partial answer" },
                { "type": "tool_use", "id": "toolu_01", "name": "get_alerts", "input": "CA" }
            ]
        })
        .to_string();

        let err = backend().parse_response(&body).unwrap_err();
        assert_eq!(err.partial_text(), Some("Partial answer"));
    }
}
