//! Declarations for the genai crate
//!
//! genai translates `{name, description, schema}` into whatever the selected
//! model expects, so only the generic dialect checks apply here.

use serde_json::{json, Value};

use crate::types::{BackendKind, Tool};
use super::dialect::{validate_schema, NameRule, SchemaRules};
use super::error::SchemaResult;
use super::traits::{object_field, str_field, SchemaAdapter, ToolDeclaration};

const RULES: SchemaRules = SchemaRules {
    backend: BackendKind::Genai,
    forbidden_keywords: &[],
    name_rule: NameRule::Any,
};

/// `{name, description, schema}`, mirroring `genai::chat::Tool`
#[derive(Debug, Clone, Copy, Default)]
pub struct GenaiSchemaAdapter;

impl GenaiSchemaAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl SchemaAdapter for GenaiSchemaAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Genai
    }

    fn to_backend_declaration(&self, tool: &Tool) -> SchemaResult<ToolDeclaration> {
        validate_schema(tool, &RULES)?;

        Ok(ToolDeclaration {
            backend: BackendKind::Genai,
            name: tool.name.clone(),
            payload: json!({
                "name": tool.name,
                "description": tool.description,
                "schema": tool.parameter_schema,
            }),
        })
    }

    fn from_backend_declaration(&self, declaration: &ToolDeclaration) -> SchemaResult<Tool> {
        self.check_backend(declaration)?;

        let payload = &declaration.payload;
        Ok(Tool {
            name: str_field(payload, "name", BackendKind::Genai)?.to_string(),
            description: payload
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            parameter_schema: object_field(payload, "schema", BackendKind::Genai)?.clone(),
        })
    }
}
