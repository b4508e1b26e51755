//! Backend calling-convention identifier

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// LLM backend selected for a session
///
/// Each kind has its own tool-declaration format and response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions (`tools: [{type: function, ...}]`)
    OpenAi,
    /// Anthropic messages API (`tools: [{name, description, input_schema}]`)
    Anthropic,
    /// Gemini generateContent (`functionDeclarations`)
    Gemini,
    /// Any model reachable through the genai crate
    Genai,
    /// Scripted backend for tests, speaking the OpenAI convention
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Gemini => "gemini",
            BackendKind::Genai => "genai",
            BackendKind::Mock => "mock",
        }
    }

    /// All kinds accepted in configuration
    pub fn all() -> &'static [BackendKind] {
        &[
            BackendKind::OpenAi,
            BackendKind::Anthropic,
            BackendKind::Gemini,
            BackendKind::Genai,
            BackendKind::Mock,
        ]
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(BackendKind::OpenAi),
            "anthropic" | "claude" => Ok(BackendKind::Anthropic),
            "gemini" | "google" => Ok(BackendKind::Gemini),
            "genai" => Ok(BackendKind::Genai),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!("unknown backend kind: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Claude".parse::<BackendKind>(), Ok(BackendKind::Anthropic));
        assert_eq!("google".parse::<BackendKind>(), Ok(BackendKind::Gemini));
        assert!("cobol".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for kind in BackendKind::all() {
            assert_eq!(kind.to_string().parse::<BackendKind>(), Ok(*kind));
        }
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&BackendKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
    }
}
