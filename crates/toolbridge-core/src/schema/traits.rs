//! Schema adapter trait definition

use serde::Serialize;
use serde_json::Value;

use crate::types::{BackendKind, Tool};
use super::error::{SchemaResult, SchemaTranslationError};

/// Backend-specific tool declaration
///
/// Derived from a `Tool` by a `SchemaAdapter`; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDeclaration {
    /// Backend whose calling convention `payload` follows
    pub backend: BackendKind,
    /// Exact tool name, used to match invocation requests
    pub name: String,
    /// Declaration in the backend's wire shape
    pub payload: Value,
}

/// Converts tools into one backend's declaration format
///
/// Implementations are pure: the same tool always yields the same
/// declaration.
pub trait SchemaAdapter: Send + Sync {
    /// Backend this adapter targets
    fn backend(&self) -> BackendKind;

    /// Translate a tool into a declaration
    fn to_backend_declaration(&self, tool: &Tool) -> SchemaResult<ToolDeclaration>;

    /// Reference decoder: recover the tool from a declaration
    fn from_backend_declaration(&self, declaration: &ToolDeclaration) -> SchemaResult<Tool>;

    /// Translate many tools, keeping failures apart
    fn to_backend_declarations(
        &self,
        tools: &[Tool],
    ) -> (Vec<ToolDeclaration>, Vec<SchemaTranslationError>) {
        let mut declarations = Vec::with_capacity(tools.len());
        let mut rejected = Vec::new();
        for tool in tools {
            match self.to_backend_declaration(tool) {
                Ok(declaration) => declarations.push(declaration),
                Err(e) => rejected.push(e),
            }
        }
        (declarations, rejected)
    }

    /// Check that a declaration was produced for this adapter's backend
    fn check_backend(&self, declaration: &ToolDeclaration) -> SchemaResult<()> {
        if declaration.backend == self.backend() {
            Ok(())
        } else {
            Err(SchemaTranslationError::BackendMismatch {
                expected: self.backend(),
                found: declaration.backend,
            })
        }
    }
}

/// Read a string field from a declaration payload
pub(crate) fn str_field<'a>(
    value: &'a Value,
    field: &str,
    backend: BackendKind,
) -> SchemaResult<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaTranslationError::MalformedDeclaration {
            backend,
            message: format!("missing string field '{}'", field),
        })
}

/// Read an object field from a declaration payload
pub(crate) fn object_field<'a>(
    value: &'a Value,
    field: &str,
    backend: BackendKind,
) -> SchemaResult<&'a Value> {
    value
        .get(field)
        .filter(|v| v.is_object())
        .ok_or_else(|| SchemaTranslationError::MalformedDeclaration {
            backend,
            message: format!("missing object field '{}'", field),
        })
}
