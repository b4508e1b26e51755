//! OpenAI-compatible function declarations

use serde_json::{json, Value};

use crate::types::{BackendKind, Tool};
use super::dialect::{validate_schema, NameRule, SchemaRules};
use super::error::{SchemaResult, SchemaTranslationError};
use super::traits::{object_field, str_field, SchemaAdapter, ToolDeclaration};

const RULES: SchemaRules = SchemaRules {
    backend: BackendKind::OpenAi,
    forbidden_keywords: &[],
    name_rule: NameRule::Plain { max_len: 64 },
};

/// `{"type": "function", "function": {name, description, parameters}}`
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiSchemaAdapter;

impl OpenAiSchemaAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaAdapter for OpenAiSchemaAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::OpenAi
    }

    fn to_backend_declaration(&self, tool: &Tool) -> SchemaResult<ToolDeclaration> {
        validate_schema(tool, &RULES)?;

        Ok(ToolDeclaration {
            backend: BackendKind::OpenAi,
            name: tool.name.clone(),
            payload: json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameter_schema,
                }
            }),
        })
    }

    fn from_backend_declaration(&self, declaration: &ToolDeclaration) -> SchemaResult<Tool> {
        self.check_backend(declaration)?;

        let kind = str_field(&declaration.payload, "type", BackendKind::OpenAi)?;
        if kind != "function" {
            return Err(SchemaTranslationError::MalformedDeclaration {
                backend: BackendKind::OpenAi,
                message: format!("unexpected tool type '{}'", kind),
            });
        }

        let function = object_field(&declaration.payload, "function", BackendKind::OpenAi)?;
        Ok(Tool {
            name: str_field(function, "name", BackendKind::OpenAi)?.to_string(),
            description: function
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameter_schema: object_field(function, "parameters", BackendKind::OpenAi)?.clone(),
        })
    }
}
