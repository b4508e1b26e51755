//! Gemini generateContent backend

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::logging::Logger;
use crate::schema::ToolDeclaration;
use crate::types::{BackendKind, ToolInvocationRequest, Turn};
use super::error::{BackendError, BackendResult};
use super::http::{build_client, decode, require_api_key, send};
use super::traits::{AssistantReply, Backend, BackendSettings, CallIdSequence};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";
const NAME: &str = "gemini";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

/// Serialized as `{"text": ..}`, `{"functionCall": ..}` or `{"functionResponse": ..}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    FunctionCall { name: String, args: Value },
    FunctionResponse { name: String, response: Value },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Value>,
    #[serde(default)]
    prompt_feedback: Option<Value>,
}

/// generateContent backend
pub struct GeminiBackend {
    settings: BackendSettings,
    api_key: String,
    http: Client,
    call_ids: CallIdSequence,
    logger: Arc<dyn Logger>,
}

impl GeminiBackend {
    pub fn new(settings: BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Self> {
        let api_key = require_api_key(&settings)?;
        let http = build_client(&settings)?;
        Ok(Self {
            settings,
            api_key,
            http,
            call_ids: CallIdSequence::new("gemini_call"),
            logger,
        })
    }

    fn build_request(&self, transcript: &[Turn], tools: &[ToolDeclaration]) -> GenerateRequest {
        GenerateRequest {
            contents: to_contents(transcript),
            tools: if tools.is_empty() {
                None
            } else {
                let declarations: Vec<&Value> = tools.iter().map(|d| &d.payload).collect();
                Some(json!([{ "functionDeclarations": declarations }]))
            },
            system_instruction: self.settings.system_prompt.as_ref().map(|prompt| Content {
                role: None,
                parts: vec![Part::Text(prompt.clone())],
            }),
            generation_config: GenerationConfig {
                max_output_tokens: self.settings.max_tokens,
                temperature: self.settings.temperature,
            },
        }
    }

    fn parse_response(&self, body: &str) -> BackendResult<AssistantReply> {
        let response: GenerateResponse = decode(NAME, body)?;

        let candidate = match response.candidates.first() {
            Some(candidate) => candidate,
            None => {
                let reason = response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.get("blockReason"))
                    .and_then(Value::as_str)
                    .unwrap_or("no candidates");
                return Err(BackendError::invalid_response(NAME, format!("empty reply: {}", reason)));
            }
        };

        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in &parts {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            if let Some(text) = part.get("text").and_then(Value::as_str) {
                texts.push(text.to_string());
            } else if let Some(call) = part.get("functionCall") {
                let name = call.get("name").and_then(Value::as_str);
                let args = match call.get("args") {
                    None | Some(Value::Null) => Some(Default::default()),
                    Some(Value::Object(args)) => Some(args.clone()),
                    Some(_) => None,
                };
                match (name, args) {
                    (Some(name), Some(args)) => tool_calls.push(ToolInvocationRequest::new(
                        self.call_ids
                            .fill(call.get("id").and_then(Value::as_str).map(str::to_string)),
                        name,
                        args,
                    )),
                    _ => {
                        return Err(BackendError::unparsable(
                            NAME,
                            texts.join("\n"),
                            format!("malformed functionCall: {}", call),
                        ))
                    }
                }
            }
        }

        if texts.is_empty() && tool_calls.is_empty() {
            if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
                self.logger.warn(&format!("[GeminiBackend] Empty candidate, finishReason={}", reason));
            }
        }

        Ok(AssistantReply::with_tool_calls(texts.join("\n"), tool_calls))
    }
}

/// Convert turns to contents; assistant turns use the `model` role and tool
/// results travel as `functionResponse` parts in a user content
fn to_contents(transcript: &[Turn]) -> Vec<Content> {
    let mut contents: Vec<Content> = Vec::new();

    for turn in transcript {
        let (role, parts) = match turn {
            Turn::User { text } => ("user", vec![Part::Text(text.clone())]),
            Turn::Assistant { text, tool_calls } => {
                let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    parts.push(Part::Text(text.clone()));
                }
                parts.extend(tool_calls.iter().map(|call| Part::FunctionCall {
                    name: call.tool_name.clone(),
                    args: call.arguments_value(),
                }));
                ("model", parts)
            }
            Turn::ToolResult {
                tool_name,
                content,
                ok,
                ..
            } => {
                let response = if *ok {
                    json!({ "result": content })
                } else {
                    json!({ "error": content })
                };
                (
                    "user",
                    vec![Part::FunctionResponse {
                        name: tool_name.clone(),
                        response,
                    }],
                )
            }
        };

        if parts.is_empty() {
            continue;
        }
        match contents.last_mut() {
            Some(last) if last.role == Some(role) => last.parts.extend(parts),
            _ => contents.push(Content {
                role: Some(role),
                parts,
            }),
        }
    }

    contents
}

#[async_trait]
impl Backend for GeminiBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Gemini
    }

    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url(DEFAULT_API_BASE),
            self.settings.model
        );
        let request = self.build_request(transcript, tools);

        self.logger.debug(&format!(
            "[GeminiBackend] POST {} contents={} tools={}",
            url,
            request.contents.len(),
            tools.len()
        ));

        let body = send(
            NAME,
            self.http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
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
    use crate::schema::{GeminiSchemaAdapter, SchemaAdapter};
    use crate::types::{Tool, ToolArguments, ToolInvocationResult};

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            BackendSettings::new(BackendKind::Gemini, "gemini-2.5-flash")
                .with_api_key("test-key")
                .with_system_prompt("You answer weather questions."),
            Arc::new(NoOpLogger::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_request_shape() {
        let declaration = GeminiSchemaAdapter::new()
            .to_backend_declaration(&Tool::new("get_alerts", "Alerts"))
            .unwrap();
        let transcript = vec![
            Turn::user("Alerts for CA?"),
            Turn::assistant(
                "",
                vec![ToolInvocationRequest::new("gemini_call_1", "get_alerts", ToolArguments::new())],
            ),
            Turn::tool_result(&ToolInvocationResult::success("gemini_call_1", "get_alerts", "None")),
        ];

        let request = serde_json::to_value(backend().build_request(&transcript, &[declaration])).unwrap();

        assert_eq!(request["tools"][0]["functionDeclarations"][0]["name"], "get_alerts");
        assert_eq!(request["systemInstruction"]["parts"][0]["text"], "You answer weather questions.");
        assert!(request["systemInstruction"].get("role").is_none());
        assert_eq!(request["contents"][1]["role"], "model");
        assert_eq!(request["contents"][1]["parts"][0]["functionCall"]["name"], "get_alerts");
        assert_eq!(
            request["contents"][2]["parts"][0]["functionResponse"]["response"]["result"],
            "None"
        );
        assert_eq!(request["generationConfig"]["maxOutputTokens"], 1000);
    }

    #[test]
    fn test_parse_generates_missing_call_ids() {
        let body = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "functionCall": { "name": "get_forecast", "args": { "latitude": 40.7, "longitude": -74.0 } } },
                        { "functionCall": { "name": "get_alerts", "args": { "state": "NY" } } }
                    ]
                },
                "finishReason": "STOP"
            }]
        })
        .to_string();

        let backend = backend();
        let reply = backend.parse_response(&body).unwrap();
        assert_eq!(reply.tool_calls.len(), 2);
        assert_ne!(reply.tool_calls[0].call_id, reply.tool_calls[1].call_id);

        let again = backend.parse_response(&body).unwrap();
        assert_ne!(again.tool_calls[0].call_id, reply.tool_calls[0].call_id);
    }

    #[test]
    fn test_blocked_prompt_is_invalid() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        match backend().parse_response(body) {
            Err(BackendError::InvalidResponse { message, .. }) => assert!(message.contains("SAFETY")),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }
}
