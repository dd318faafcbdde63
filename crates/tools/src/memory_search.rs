//! Memory search tool: lets the agent search its own history on demand.
//!
//! Recall already injects the closest past answers into every prompt; this
//! tool is for when the model wants to look further back or search for
//! something other than the task text.

use async_trait::async_trait;
use localagent_core::error::ToolError;
use localagent_core::memory::MemoryStore;
use localagent_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::primary_arg;

const DEFAULT_LIMIT: u64 = 3;
const MAX_LIMIT: u64 = 20;

/// A tool that queries the agent's memory store.
pub struct MemorySearchTool {
    store: Arc<dyn MemoryStore>,
}

impl MemorySearchTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

#[derive(serde::Serialize)]
struct MemoryResult {
    id: String,
    query: String,
    response: String,
    score: f32,
    timestamp: String,
}

#[async_trait]
impl Tool for MemorySearchTool {
    fn name(&self) -> &str {
        "memory_search"
    }

    fn description(&self) -> &str {
        "Search past tasks and their answers for similar work. \
         Input: what to search for."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query to find relevant past tasks"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of entries to return (default 3)",
                    "default": DEFAULT_LIMIT
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let query = primary_arg(&arguments, "query")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let limit = arguments["limit"]
            .as_u64()
            .unwrap_or(DEFAULT_LIMIT)
            .clamp(1, MAX_LIMIT) as usize;

        let entries = self
            .store
            .query(query, limit)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "memory_search".into(),
                reason: e.to_string(),
            })?;

        let results: Vec<MemoryResult> = entries
            .into_iter()
            .map(|e| MemoryResult {
                id: e.id,
                query: e.query,
                response: e.response,
                score: e.score,
                timestamp: e.timestamp.to_rfc3339(),
            })
            .collect();

        let output = if results.is_empty() {
            format!("No past tasks found matching '{query}'.")
        } else {
            results
                .iter()
                .map(|r| format!("Task: {}\nAnswer: {}", r.query, r.response))
                .collect::<Vec<_>>()
                .join("\n---\n")
        };

        Ok(ToolResult {
            success: true,
            output,
            data: serde_json::to_value(&results).ok(),
        })
    }
}
