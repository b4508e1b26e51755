//! Orchestration error types

use thiserror::Error;

use crate::backends::BackendError;
use crate::conversation::TranscriptError;

/// Errors surfaced by `OrchestrationLoop::submit`
#[derive(Error, Debug)]
pub enum OrchestrationError {
    /// The tool provider is gone; the loop is closed
    #[error("Tool provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The backend failed; the loop stays usable
    #[error("Backend unavailable: {source}")]
    BackendUnavailable {
        #[source]
        source: BackendError,
        /// Assistant text gathered before the failure, including any text
        /// recovered from a degraded reply
        partial_text: String,
    },

    /// The round limit was reached before a final answer
    #[error("Stopped after {rounds} rounds without a final answer")]
    MaxRoundsExceeded { rounds: usize, text: String },

    /// A turn could not be recorded
    #[error("Transcript error: {0}")]
    Transcript(#[from] TranscriptError),

    /// The loop was closed by an earlier fatal error
    #[error("Session is closed")]
    Closed,
}

impl OrchestrationError {
    /// Whether the loop can no longer accept input
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_) | Self::Closed)
    }

    /// Whether the backend reply was partly recovered
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable {
                source: BackendError::Degraded { .. },
                ..
            }
        )
    }

    /// Assistant text gathered before the error
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::BackendUnavailable { partial_text, .. } | Self::MaxRoundsExceeded { text: partial_text, .. }
                if !partial_text.is_empty() =>
            {
                Some(partial_text)
            }
            _ => None,
        }
    }
}

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;
