//! Tool-call orchestration
//!
//! ```text
//! AwaitingUserInput ──submit──▶ SentToBackend ──▶ AssistantFinal ──▶ AwaitingUserInput
//!                                   ▲    │
//!                                   │    ▼
//!                          Invoking ◀── AssistantRequestedTools
//!                              │
//!                              └── provider lost ──▶ Closed
//! ```

mod error;
mod state;
mod engine;

#[cfg(test)]
mod scenarios;

pub use error::{OrchestrationError, OrchestrationResult};
pub use state::{Exchange, LoopConfig, LoopState, ToolActivity};
pub use engine::OrchestrationLoop;
