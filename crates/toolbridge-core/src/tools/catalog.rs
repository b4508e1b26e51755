//! Tool catalog: discovery, caching and backend declarations
//!
//! The catalog owns the last successful `tools/list` snapshot. Reads are
//! served from that snapshot until `refresh()` replaces it, so two reads
//! without a refresh in between always see the same `Arc`.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::logging::Logger;
use crate::provider::ToolProvider;
use crate::schema::{SchemaAdapter, SchemaTranslationError, ToolDeclaration};
use crate::types::{BackendKind, Tool};
use super::filter::ToolFilter;

/// Catalog errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Provider not connected, handshake incomplete, or listing failed
    #[error("Tool provider unavailable: {0}")]
    ProviderUnavailable(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Declarations built from the filtered catalog for one backend
#[derive(Debug, Clone, Default)]
pub struct DeclarationSet {
    /// Declarations of the usable tools, in catalog order
    pub declarations: Vec<ToolDeclaration>,
    /// Tools that could not be translated, skipped
    pub rejected: Vec<SchemaTranslationError>,
}

impl DeclarationSet {
    /// Names of the declared tools
    pub fn names(&self) -> Vec<&str> {
        self.declarations.iter().map(|d| d.name.as_str()).collect()
    }

    /// Whether a tool with this name is declared
    pub fn contains(&self, name: &str) -> bool {
        self.declarations.iter().any(|d| d.name == name)
    }
}

/// Cached view of the tools offered by a provider
pub struct ToolCatalog {
    provider: Arc<dyn ToolProvider>,
    adapter: Box<dyn SchemaAdapter>,
    /// Last successful listing
    tools: RwLock<Option<Arc<Vec<Tool>>>>,
    filter: RwLock<ToolFilter>,
    /// Declarations for the current snapshot and filter
    declarations: RwLock<Option<Arc<DeclarationSet>>>,
    logger: Arc<dyn Logger>,
}

impl ToolCatalog {
    /// Create an empty catalog; nothing is fetched until `list_tools`
    pub fn new(
        provider: Arc<dyn ToolProvider>,
        adapter: Box<dyn SchemaAdapter>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            provider,
            adapter,
            tools: RwLock::new(None),
            filter: RwLock::new(ToolFilter::new()),
            declarations: RwLock::new(None),
            logger,
        }
    }

    /// Set the initial tool filter
    pub fn with_filter(self, filter: ToolFilter) -> Self {
        *self.filter.write() = filter;
        self
    }

    /// The provider this catalog reads from
    pub fn provider(&self) -> &Arc<dyn ToolProvider> {
        &self.provider
    }

    /// Backend the declarations are built for
    pub fn backend(&self) -> BackendKind {
        self.adapter.backend()
    }

    /// List the provider's tools, fetching them on first use
    pub async fn list_tools(&self) -> CatalogResult<Arc<Vec<Tool>>> {
        self.ensure_connected()?;

        if let Some(tools) = self.snapshot() {
            return Ok(tools);
        }
        self.refresh().await
    }

    /// Re-query the provider, replacing the cache on success
    ///
    /// On failure the previous snapshot stays in place and the error is
    /// returned; a failed listing is never turned into an empty catalog.
    pub async fn refresh(&self) -> CatalogResult<Arc<Vec<Tool>>> {
        self.ensure_connected()?;

        let listed = match self.provider.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                self.logger.warn(&format!(
                    "[ToolCatalog] Listing tools from {} failed, keeping previous catalog: {}",
                    self.provider.name(),
                    e
                ));
                return Err(CatalogError::ProviderUnavailable(e.to_string()));
            }
        };

        let mut seen = HashSet::new();
        let mut tools = Vec::with_capacity(listed.len());
        for tool in listed {
            if seen.insert(tool.name.clone()) {
                tools.push(tool);
            } else {
                self.logger.warn(&format!(
                    "[ToolCatalog] Duplicate tool name '{}' ignored",
                    tool.name
                ));
            }
        }

        self.logger.info(&format!(
            "[ToolCatalog] Discovered {} tools from {}",
            tools.len(),
            self.provider.name()
        ));

        let tools = Arc::new(tools);
        *self.tools.write() = Some(tools.clone());
        *self.declarations.write() = None;
        Ok(tools)
    }

    /// Current snapshot without contacting the provider
    pub fn snapshot(&self) -> Option<Arc<Vec<Tool>>> {
        self.tools.read().clone()
    }

    /// Cached tools that pass the filter
    pub fn available_tools(&self) -> Vec<Tool> {
        let filter = self.filter.read();
        self.snapshot()
            .map(|tools| {
                tools
                    .iter()
                    .filter(|tool| filter.matches(&tool.name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Find a declared tool by exact name
    ///
    /// Tools hidden by the filter or rejected by the schema adapter are not
    /// found.
    pub fn lookup(&self, name: &str) -> Option<Tool> {
        let allowed = self.filter.read().matches(name);
        if !allowed || !self.declarations().contains(name) {
            return None;
        }
        self.snapshot()
            .and_then(|tools| tools.iter().find(|tool| tool.name == name).cloned())
    }

    /// Enable or disable one tool
    pub fn set_tool_enabled(&self, name: &str, enabled: bool) {
        self.filter.write().set_enabled(name, enabled);
        *self.declarations.write() = None;
        self.logger.debug(&format!(
            "[ToolCatalog] Tool '{}' {}",
            name,
            if enabled { "enabled" } else { "disabled" }
        ));
    }

    /// Backend declarations for the available tools
    ///
    /// Tools that fail translation are logged and left out; the rest stay
    /// usable.
    pub fn declarations(&self) -> Arc<DeclarationSet> {
        if let Some(set) = self.declarations.read().clone() {
            return set;
        }

        let (declarations, rejected) = self.adapter.to_backend_declarations(&self.available_tools());
        for error in &rejected {
            self.logger.warn(&format!("[ToolCatalog] Skipping tool: {}", error));
        }

        let set = Arc::new(DeclarationSet {
            declarations,
            rejected,
        });
        *self.declarations.write() = Some(set.clone());
        set
    }

    fn ensure_connected(&self) -> CatalogResult<()> {
        if self.provider.is_connected() {
            Ok(())
        } else {
            Err(CatalogError::ProviderUnavailable(format!(
                "{} is not connected",
                self.provider.name()
            )))
        }
    }
}
