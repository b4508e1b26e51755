//! Tool selection filter

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Selects which catalog tools are offered to the backend
///
/// A tool filtered out here is also unknown to the invoker: the model cannot
/// call what it was never offered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolFilter {
    /// If set, only include tools with these names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<HashSet<String>>,
    /// Exclude tools with these names
    #[serde(default, skip_serializing_if = "HashSet::is_empty")]
    pub exclude: HashSet<String>,
    /// Per-tool enabled switch set at runtime
    #[serde(skip)]
    pub enabled: HashMap<String, bool>,
}

impl ToolFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include only specific tools
    pub fn with_include(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.include = Some(names.into_iter().collect());
        self
    }

    /// Exclude specific tools
    pub fn with_exclude(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.exclude = names.into_iter().collect();
        self
    }

    /// Enable or disable a single tool
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        self.enabled.insert(name.to_string(), enabled);
    }

    /// Check if a tool name passes this filter
    pub fn matches(&self, name: &str) -> bool {
        if self.enabled.get(name) == Some(&false) {
            return false;
        }

        if self.exclude.contains(name) {
            return false;
        }

        match &self.include {
            Some(include) => include.contains(name),
            None => true,
        }
    }
}
