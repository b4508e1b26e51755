//! API key lookup
//!
//! Order: literal `api_key`, then the variable named by `api_key_env`, then
//! the conventional variables of the backend.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::types::BackendKind;
use super::settings::BackendSection;

/// Conventional environment variables per vendor
static ENV_VAR_MAP: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("openai", vec!["OPENAI_API_KEY"]);
    m.insert("anthropic", vec!["ANTHROPIC_API_KEY"]);
    m.insert("gemini", vec!["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("mock", vec![]);
    m
});

/// Environment variables consulted for a backend
///
/// The genai backend serves several vendors, so the vendor is guessed from
/// the model name.
pub fn env_vars_for(kind: BackendKind, model: &str) -> &'static [&'static str] {
    let vendor = match kind {
        BackendKind::Genai => {
            let model = model.to_lowercase();
            if model.starts_with("claude") {
                "anthropic"
            } else if model.starts_with("gemini") {
                "gemini"
            } else if model.starts_with("gpt") || model.starts_with('o') {
                "openai"
            } else {
                return &[];
            }
        }
        other => other.as_str(),
    };
    ENV_VAR_MAP.get(vendor).map(|v| v.as_slice()).unwrap_or(&[])
}

/// Find the API key for a backend
pub(crate) fn resolve_api_key(
    section: &BackendSection,
    kind: BackendKind,
    model: &str,
    env: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(section.api_key.clone()) {
        return Some(key);
    }
    if let Some(name) = &section.api_key_env {
        if let Some(key) = non_empty(env(name)) {
            return Some(key);
        }
    }
    env_vars_for(kind, model)
        .iter()
        .find_map(|name| non_empty(env(name)))
}
