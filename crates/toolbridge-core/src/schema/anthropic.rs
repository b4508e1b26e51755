//! Anthropic messages API tool declarations

use serde_json::{json, Value};

use crate::types::{BackendKind, Tool};
use super::dialect::{validate_schema, NameRule, SchemaRules};
use super::error::SchemaResult;
use super::traits::{object_field, str_field, SchemaAdapter, ToolDeclaration};

const RULES: SchemaRules = SchemaRules {
    backend: BackendKind::Anthropic,
    forbidden_keywords: &[],
    name_rule: NameRule::Plain { max_len: 64 },
};

/// `{name, description, input_schema}`
#[derive(Debug, Clone, Copy, Default)]
pub struct AnthropicSchemaAdapter;

impl AnthropicSchemaAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaAdapter for AnthropicSchemaAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Anthropic
    }

    fn to_backend_declaration(&self, tool: &Tool) -> SchemaResult<ToolDeclaration> {
        validate_schema(tool, &RULES)?;

        Ok(ToolDeclaration {
            backend: BackendKind::Anthropic,
            name: tool.name.clone(),
            payload: json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.parameter_schema,
            }),
        })
    }

    fn from_backend_declaration(&self, declaration: &ToolDeclaration) -> SchemaResult<Tool> {
        self.check_backend(declaration)?;

        let payload = &declaration.payload;
        Ok(Tool {
            name: str_field(payload, "name", BackendKind::Anthropic)?.to_string(),
            description: payload
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameter_schema: object_field(payload, "input_schema", BackendKind::Anthropic)?.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_and_round_trip() {
        let tool = Tool::new("get_forecast", "Get weather forecast for a location.")
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "latitude": { "type": "number", "minimum": -90, "maximum": 90 },
                    "longitude": { "type": "number", "minimum": -180, "maximum": 180 }
                },
                "required": ["latitude", "longitude"]
            }));
        let adapter = AnthropicSchemaAdapter::new();

        let declaration = adapter.to_backend_declaration(&tool).unwrap();
        assert_eq!(declaration.payload["input_schema"]["required"][1], "longitude");
        assert!(declaration.payload.get("type").is_none());

        assert_eq!(adapter.from_backend_declaration(&declaration).unwrap(), tool);
    }
}
