//! Conversation transcript

mod state;

pub use state::{ConversationState, TranscriptError, TranscriptResult};
