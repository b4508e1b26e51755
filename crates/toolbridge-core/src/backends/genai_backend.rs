//! Backend driven by the genai crate
//!
//! genai picks the adapter from the model name (`gpt-*`, `claude-*`,
//! `gemini-*`, ollama models, ...) and handles each vendor's protocol. Auth
//! comes from the resolved settings, falling back to genai's own env lookup.

use std::sync::Arc;

use async_trait::async_trait;
use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, ChatRequest, ContentPart,
    Tool as GenaiTool, ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use serde_json::{json, Value};

use crate::logging::Logger;
use crate::schema::{GenaiSchemaAdapter, SchemaAdapter, ToolDeclaration};
use crate::types::{BackendKind, ToolInvocationRequest, Turn};
use super::error::{BackendError, BackendResult};
use super::traits::{AssistantReply, Backend, BackendSettings, CallIdSequence};

const NAME: &str = "genai";

/// Backend using genai's non-streaming `exec_chat`
pub struct GenaiBackend {
    settings: BackendSettings,
    client: Client,
    call_ids: CallIdSequence,
    logger: Arc<dyn Logger>,
}

impl GenaiBackend {
    pub fn new(settings: BackendSettings, logger: Arc<dyn Logger>) -> Self {
        let client = create_client(&settings);
        Self {
            settings,
            client,
            call_ids: CallIdSequence::new("genai_call"),
            logger,
        }
    }

    fn to_options(&self) -> GenaiOptions {
        let mut options = GenaiOptions::default().with_max_tokens(self.settings.max_tokens);
        if let Some(temperature) = self.settings.temperature {
            options = options.with_temperature(temperature as f64);
        }
        options
    }

    fn requests_from(&self, texts: &str, calls: Vec<&GenaiToolCall>) -> BackendResult<Vec<ToolInvocationRequest>> {
        let mut requests = Vec::with_capacity(calls.len());
        for call in calls {
            let arguments = match &call.fn_arguments {
                Value::Object(arguments) => arguments.clone(),
                Value::Null => Default::default(),
                other => {
                    return Err(BackendError::unparsable(
                        NAME,
                        texts.to_string(),
                        format!("tool call '{}' has non-object arguments: {}", call.fn_name, other),
                    ))
                }
            };
            requests.push(ToolInvocationRequest::new(
                self.call_ids.fill(Some(call.call_id.clone())),
                call.fn_name.clone(),
                arguments,
            ));
        }
        Ok(requests)
    }
}

/// Create a genai client honoring an explicit API key and base URL
fn create_client(settings: &BackendSettings) -> Client {
    let mut builder = Client::builder();

    if let Some(key) = settings.api_key.clone() {
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden: ModelIden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(key.clone())))
            },
        );
        builder = builder.with_auth_resolver(auth_resolver);
    }

    if let Some(base) = settings.api_base.clone() {
        let endpoint = format!("{}/", base.trim_end_matches('/'));
        let target_resolver = ServiceTargetResolver::from_resolver_fn(
            move |target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
                Ok(ServiceTarget {
                    endpoint: Endpoint::from_owned(endpoint.clone()),
                    auth: target.auth,
                    model: target.model,
                })
            },
        );
        builder = builder.with_service_target_resolver(target_resolver);
    }

    builder.build()
}

/// Convert a transcript to genai messages
fn to_genai_messages(transcript: &[Turn]) -> BackendResult<Vec<GenaiMessage>> {
    let mut messages = Vec::with_capacity(transcript.len());
    for turn in transcript {
        let message = match turn {
            Turn::User { text } => GenaiMessage::user(text.clone()),
            Turn::Assistant { text, tool_calls } if tool_calls.is_empty() => {
                GenaiMessage::assistant(text.clone())
            }
            Turn::Assistant { text, tool_calls } => {
                let mut parts = Vec::with_capacity(tool_calls.len() + 1);
                if !text.is_empty() {
                    parts.push(ContentPart::Text(text.clone()));
                }
                for call in tool_calls {
                    parts.push(ContentPart::ToolCall(to_genai_tool_call(call)?));
                }
                GenaiMessage::assistant(parts)
            }
            Turn::ToolResult { call_id, content, .. } => GenaiMessage::user(vec![
                ContentPart::ToolResponse(GenaiToolResponse::new(call_id.clone(), content.clone())),
            ]),
        };
        messages.push(message);
    }
    Ok(messages)
}

/// Rebuild the genai tool call for a request already in the transcript
fn to_genai_tool_call(request: &ToolInvocationRequest) -> BackendResult<GenaiToolCall> {
    serde_json::from_value(json!({
        "call_id": request.call_id,
        "fn_name": request.tool_name,
        "fn_arguments": request.arguments_value(),
    }))
    .map_err(|e| BackendError::Other(format!("cannot encode tool call {}: {}", request.call_id, e)))
}

/// Convert declarations produced by `GenaiSchemaAdapter` to genai tools
fn to_genai_tools(declarations: &[ToolDeclaration]) -> BackendResult<Vec<GenaiTool>> {
    let adapter = GenaiSchemaAdapter::new();
    declarations
        .iter()
        .map(|declaration| {
            let tool = adapter
                .from_backend_declaration(declaration)
                .map_err(|e| BackendError::Other(e.to_string()))?;
            Ok(GenaiTool::new(tool.name)
                .with_description(tool.description)
                .with_schema(tool.parameter_schema))
        })
        .collect()
}

#[async_trait]
impl Backend for GenaiBackend {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Genai
    }

    async fn complete(
        &self,
        transcript: &[Turn],
        tools: &[ToolDeclaration],
    ) -> BackendResult<AssistantReply> {
        let mut request = ChatRequest::new(to_genai_messages(transcript)?);
        if let Some(system) = &self.settings.system_prompt {
            request = request.with_system(system.clone());
        }
        if !tools.is_empty() {
            request = request.with_tools(to_genai_tools(tools)?);
        }

        self.logger.debug(&format!(
            "[GenaiBackend] exec_chat model={} messages={} tools={}",
            self.settings.model,
            transcript.len(),
            tools.len()
        ));

        let response = self
            .client
            .exec_chat(&self.settings.model, request, Some(&self.to_options()))
            .await
            .map_err(|e| BackendError::api(NAME, 500, e.to_string()))?;

        let text = response.texts().join("\n");
        let tool_calls = self.requests_from(&text, response.tool_calls())?;
        Ok(AssistantReply::with_tool_calls(text, tool_calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Tool, ToolArguments, ToolInvocationResult};
    use genai::chat::ChatRole as GenaiRole;

    #[test]
    fn test_message_conversion() {
        let mut args = ToolArguments::new();
        args.insert("state".to_string(), json!("TX"));
        let transcript = vec![
            Turn::user("Alerts in Texas?"),
            Turn::assistant("", vec![ToolInvocationRequest::new("toolu_1", "get_alerts", args)]),
            Turn::tool_result(&ToolInvocationResult::success("toolu_1", "get_alerts", "Heat advisory")),
        ];

        let messages = to_genai_messages(&transcript).unwrap();
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0].role, GenaiRole::User));
        assert!(matches!(messages[1].role, GenaiRole::Assistant));
        assert!(matches!(messages[2].role, GenaiRole::User));
    }

    #[test]
    fn test_tool_call_conversion() {
        let mut args = ToolArguments::new();
        args.insert("latitude".to_string(), json!(29.76));
        let call = to_genai_tool_call(&ToolInvocationRequest::new("c1", "get_forecast", args)).unwrap();

        assert_eq!(call.call_id, "c1");
        assert_eq!(call.fn_name, "get_forecast");
        assert_eq!(call.fn_arguments["latitude"], json!(29.76));
    }

    #[test]
    fn test_tool_conversion() {
        let declaration = GenaiSchemaAdapter::new()
            .to_backend_declaration(&Tool::new("get_weather", "Get weather for a location"))
            .unwrap();

        let tools = to_genai_tools(&[declaration]).unwrap();
        assert_eq!(tools[0].name, "get_weather");
    }
}
