//! Tool schema translation
//!
//! Every backend declares tools in its own shape. A `SchemaAdapter` turns a
//! provider `Tool` into that shape without touching the name, the description
//! or any parameter constraint, and fails fast when it cannot.
//!
//! | Backend   | Declaration                                                   |
//! |-----------|---------------------------------------------------------------|
//! | openai    | `{type: "function", function: {name, description, parameters}}` |
//! | anthropic | `{name, description, input_schema}`                           |
//! | gemini    | `{name, description, parametersJsonSchema}`                   |
//! | genai     | `{name, description, schema}`                                 |

mod traits;
mod error;
mod dialect;
mod openai;
mod anthropic;
mod gemini;
mod genai;

pub use traits::{SchemaAdapter, ToolDeclaration};
pub use error::{SchemaTranslationError, SchemaResult};
pub use dialect::{validate_schema, NameRule, SchemaRules};
pub use openai::OpenAiSchemaAdapter;
pub use anthropic::AnthropicSchemaAdapter;
pub use gemini::GeminiSchemaAdapter;
pub use genai::GenaiSchemaAdapter;

use crate::types::BackendKind;

/// Create the schema adapter for a backend kind
///
/// The mock backend speaks the OpenAI convention.
pub fn adapter_for(kind: BackendKind) -> Box<dyn SchemaAdapter> {
    match kind {
        BackendKind::OpenAi | BackendKind::Mock => Box::new(OpenAiSchemaAdapter::new()),
        BackendKind::Anthropic => Box::new(AnthropicSchemaAdapter::new()),
        BackendKind::Gemini => Box::new(GeminiSchemaAdapter::new()),
        BackendKind::Genai => Box::new(GenaiSchemaAdapter::new()),
    }
}
