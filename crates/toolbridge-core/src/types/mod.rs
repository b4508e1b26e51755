//! Core types for tool-call orchestration
//!
//! This module contains the shared data model used by the catalog, the
//! schema adapters, the backends and the orchestration loop.

mod backend_kind;
mod tool;
mod turn;

pub use backend_kind::BackendKind;
pub use tool::{Tool, ToolInvocationRequest, ToolInvocationResult, ToolArguments};
pub use turn::Turn;
