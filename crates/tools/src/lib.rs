//! Built-in tool implementations for LocalAgent.
//!
//! The catalog: a programming reference, a static
//! code checker, and (when a store is available) a search over past runs.

pub mod code_review;
pub mod knowledge_lookup;
pub mod memory_search;

use localagent_core::memory::MemoryStore;
use localagent_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;

pub use code_review::CodeReviewTool;
pub use knowledge_lookup::KnowledgeLookupTool;
pub use memory_search::MemorySearchTool;

/// Create a registry with the tools that need no external state.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(KnowledgeLookupTool));
    registry.register(Box::new(CodeReviewTool));
    registry
}

/// The full catalog, with `memory_search` bound to `store`.
pub fn registry_with_memory(store: Arc<dyn MemoryStore>, timeout: Duration) -> ToolRegistry {
    let mut registry = default_registry().with_timeout(timeout);
    registry.register(Box::new(MemorySearchTool::new(store)));
    registry
}

/// Pull the main string argument out of a tool call.
///
/// Models often send `{"input": "..."}` or a bare JSON string instead of the
/// named field, so both are accepted. Blank strings count as missing.
pub(crate) fn primary_arg<'a>(arguments: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    arguments[key]
        .as_str()
        .or_else(|| arguments["input"].as_str())
        .or_else(|| arguments.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Lowercased alphanumeric words.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(String::from)
        .collect()
}
