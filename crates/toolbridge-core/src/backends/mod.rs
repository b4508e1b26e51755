//! LLM backends
//!
//! One `Backend` per calling convention. The wire-level backends speak
//! HTTP/JSON through reqwest; `GenaiBackend` delegates to the genai crate;
//! `ScriptedBackend` is kept for tests and offline runs.

mod traits;
mod error;
mod http;
mod openai;
mod anthropic;
mod gemini;
mod genai_backend;
mod mock;

pub use traits::{AssistantReply, Backend, BackendSettings};
pub use error::{BackendError, BackendResult};
pub use openai::OpenAiBackend;
pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use genai_backend::GenaiBackend;
pub use mock::{RecordedRequest, ScriptStep, ScriptedBackend};

use std::sync::Arc;

use crate::logging::Logger;
use crate::types::BackendKind;

/// Create the backend selected by the settings
pub fn create_backend(settings: BackendSettings, logger: Arc<dyn Logger>) -> BackendResult<Box<dyn Backend>> {
    logger.info(&format!(
        "[Backends] Creating {} backend for model {}",
        settings.kind, settings.model
    ));

    let backend: Box<dyn Backend> = match settings.kind {
        BackendKind::OpenAi => Box::new(OpenAiBackend::new(settings, logger)?),
        BackendKind::Anthropic => Box::new(AnthropicBackend::new(settings, logger)?),
        BackendKind::Gemini => Box::new(GeminiBackend::new(settings, logger)?),
        BackendKind::Genai => Box::new(GenaiBackend::new(settings, logger)),
        BackendKind::Mock => Box::new(ScriptedBackend::new(logger)),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;

    #[test]
    fn test_create_backend_kinds() {
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());

        let mock = create_backend(BackendSettings::new(BackendKind::Mock, "echo"), logger.clone()).unwrap();
        assert_eq!(mock.kind(), BackendKind::Mock);

        let openai = create_backend(
            BackendSettings::new(BackendKind::OpenAi, "gpt-4o-mini").with_api_key("sk-test"),
            logger.clone(),
        )
        .unwrap();
        assert_eq!(openai.kind(), BackendKind::OpenAi);

        assert!(matches!(
            create_backend(BackendSettings::new(BackendKind::Anthropic, "claude"), logger),
            Err(BackendError::MissingApiKey { .. })
        ));
    }
}
