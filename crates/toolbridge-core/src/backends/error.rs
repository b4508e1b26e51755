//! Backend error types

use std::time::Duration;

use thiserror::Error;

/// Errors raised while talking to an LLM backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Missing API key
    #[error("API key is required for {backend}")]
    MissingApiKey { backend: String },

    /// API request failed
    #[error("{backend} API error ({status}): {message}")]
    Api {
        backend: String,
        status: u16,
        message: String,
    },

    /// Network/HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response could not be understood at all
    #[error("Invalid response from {backend}: {message}")]
    InvalidResponse { backend: String, message: String },

    /// Response was partly understood; the text recovered so far is kept
    #[error("Degraded response from {backend}: {message}")]
    Degraded {
        backend: String,
        partial_text: String,
        message: String,
    },

    /// No reply within the configured time
    #[error("{backend} did not answer within {after:?}")]
    Timeout { backend: String, after: Duration },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Create an API error
    pub fn api(backend: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            backend: backend.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a missing API key error
    pub fn missing_api_key(backend: impl Into<String>) -> Self {
        Self::MissingApiKey {
            backend: backend.into(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Invalid response, or degraded if some text was recovered
    pub fn unparsable(backend: impl Into<String>, partial_text: String, message: impl Into<String>) -> Self {
        if partial_text.trim().is_empty() {
            Self::invalid_response(backend, message)
        } else {
            Self::Degraded {
                backend: backend.into(),
                partial_text,
                message: message.into(),
            }
        }
    }

    /// Text recovered before the failure, if any
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::Degraded { partial_text, .. } => Some(partial_text),
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
