//! Gemini function declarations
//!
//! Parameters go into `parametersJsonSchema`, which takes JSON Schema
//! directly. The keywords Gemini does not evaluate are rejected rather than
//! dropped. The root `$schema` marker is checked, then left out because the
//! API refuses it.

use serde_json::{json, Value};

use crate::types::{BackendKind, Tool};
use super::dialect::{validate_schema, NameRule, SchemaRules};
use super::error::SchemaResult;
use super::traits::{object_field, str_field, SchemaAdapter, ToolDeclaration};

const RULES: SchemaRules = SchemaRules {
    backend: BackendKind::Gemini,
    forbidden_keywords: &[
        "$ref",
        "oneOf",
        "allOf",
        "not",
        "if",
        "then",
        "else",
        "patternProperties",
        "dependentSchemas",
        "dependentRequired",
        "unevaluatedProperties",
        "unevaluatedItems",
        "contains",
    ],
    name_rule: NameRule::Gemini,
};

/// `{name, description, parametersJsonSchema}`
#[derive(Debug, Clone, Copy, Default)]
pub struct GeminiSchemaAdapter;

impl GeminiSchemaAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaAdapter for GeminiSchemaAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Gemini
    }

    fn to_backend_declaration(&self, tool: &Tool) -> SchemaResult<ToolDeclaration> {
        validate_schema(tool, &RULES)?;

        let mut parameters = tool.parameter_schema.clone();
        if let Some(root) = parameters.as_object_mut() {
            root.remove("$schema");
        }

        Ok(ToolDeclaration {
            backend: BackendKind::Gemini,
            name: tool.name.clone(),
            payload: json!({
                "name": tool.name,
                "description": tool.description,
                "parametersJsonSchema": parameters,
            }),
        })
    }

    fn from_backend_declaration(&self, declaration: &ToolDeclaration) -> SchemaResult<Tool> {
        self.check_backend(declaration)?;

        let payload = &declaration.payload;
        Ok(Tool {
            name: str_field(payload, "name", BackendKind::Gemini)?.to_string(),
            description: payload
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameter_schema: object_field(payload, "parametersJsonSchema", BackendKind::Gemini)?
                .clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaTranslationError;

    #[test]
    fn test_round_trip_preserves_constraints() {
        let tool = Tool::new("get_alerts", "Get weather alerts").with_schema(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": "object",
            "properties": {
                "state": { "type": "string", "enum": ["CA", "NY"] }
            },
            "required": ["state"],
            "additionalProperties": false
        }));
        let adapter = GeminiSchemaAdapter::new();

        let declaration = adapter.to_backend_declaration(&tool).unwrap();
        assert!(declaration.payload["parametersJsonSchema"].get("$schema").is_none());

        let decoded = adapter.from_backend_declaration(&declaration).unwrap();
        let mut expected = tool.parameter_schema.clone();
        expected.as_object_mut().unwrap().remove("$schema");
        assert_eq!(decoded.name, tool.name);
        assert_eq!(decoded.description, tool.description);
        assert_eq!(decoded.parameter_schema, expected);
    }

    #[test]
    fn test_rejects_all_of() {
        let tool = Tool::new("merge", "").with_schema(json!({
            "type": "object",
            "allOf": [ { "required": ["a"] }, { "required": ["b"] } ]
        }));

        let err = GeminiSchemaAdapter::new().to_backend_declaration(&tool).unwrap_err();
        assert!(matches!(err, SchemaTranslationError::UnsupportedKeyword { ref keyword, .. } if keyword == "allOf"));
    }
}
