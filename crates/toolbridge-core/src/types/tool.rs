//! Tool, invocation request and invocation result types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named arguments passed to a tool
pub type ToolArguments = Map<String, Value>;

/// Tool advertised by a tool provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name, unique within a provider
    pub name: String,
    /// Description of what the tool does
    #[serde(default)]
    pub description: String,
    /// JSON Schema describing the tool's parameters
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub parameter_schema: Value,
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

impl Tool {
    /// Create a new tool with an empty object schema
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema: empty_object_schema(),
        }
    }

    /// Set the parameter schema
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.parameter_schema = schema;
        self
    }
}

/// Tool invocation requested by the LLM backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    /// Opaque identifier assigned by the backend
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Name of the tool being called
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Arguments keyed by parameter name
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolInvocationRequest {
    /// Create a new invocation request
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: ToolArguments,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Arguments as a JSON object value
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}

/// Normalized outcome of a tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationResult {
    /// ID of the request this result answers
    #[serde(rename = "callId")]
    pub call_id: String,
    /// Name of the tool that was called
    #[serde(rename = "toolName")]
    pub tool_name: String,
    /// Textual result content, never truncated
    pub content: String,
    /// Structured payload reported by the provider, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
    /// Whether the tool succeeded
    pub ok: bool,
}

impl ToolInvocationResult {
    /// Create a successful result
    pub fn success(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
            structured: None,
            ok: true,
        }
    }

    /// Create a failed result with a human-readable description
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            content: message.into(),
            structured: None,
            ok: false,
        }
    }

    /// Attach a structured payload
    pub fn with_structured(mut self, structured: Value) -> Self {
        self.structured = Some(structured);
        self
    }
}
