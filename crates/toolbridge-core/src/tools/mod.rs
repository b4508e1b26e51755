//! Tool discovery, selection and execution
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  ToolCatalog                                 │
//! │   - fetches tools via tools/list, caches     │
//! │   - applies the ToolFilter                   │
//! │   - builds backend declarations              │
//! └──────────────────────────────────────────────┘
//!           │ lookup                 ▲ snapshot
//!           ▼                        │
//! ┌──────────────────────────────────────────────┐
//! │  ToolInvoker                                 │
//! │   - rejects unknown names                    │
//! │   - calls the provider, normalizes output    │
//! │   - runs request batches in order            │
//! └──────────────────────────────────────────────┘
//!           │ tools/call
//!           ▼
//!     ToolProvider (MCP server)
//! ```

mod catalog;
mod filter;
mod invoker;

pub use catalog::{ToolCatalog, CatalogError, CatalogResult, DeclarationSet};
pub use filter::ToolFilter;
pub use invoker::{ToolInvoker, InvokeError, InvokeResult};
