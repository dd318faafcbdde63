//! Memory traits: persistent (query, response) history with semantic recall.
//!
//! Every finished run leaves one `MemoryEntry` behind. Later runs query the
//! store by similarity to inject relevant past answers into their prompt.
//! Writes are best-effort: callers log a failed write and move on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MemoryError;

/// A single remembered interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique ID for this memory
    pub id: String,

    /// The task text that produced this entry
    pub query: String,

    /// The final answer, or an error summary
    pub response: String,

    /// When this memory was created
    pub timestamp: DateTime<Utc>,

    /// Free-form metadata (run id, status, context, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,

    /// Relevance score (set by query operations)
    #[serde(default)]
    pub score: f32,

    /// Embedding of `query`, filled in by the store on write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl MemoryEntry {
    pub fn new(query: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            response: response.into(),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
            score: 0.0,
            embedding: None,
        }
    }

    /// Attach a metadata field.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Turns text into a vector for similarity search.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn name(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError>;
}

/// The core MemoryStore trait.
///
/// Implementations: in-memory, JSON Lines file, none (no-op).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Persist an entry. Returns the entry id.
    async fn write(&self, entry: MemoryEntry) -> Result<String, MemoryError>;

    /// Up to `k` entries ordered by descending similarity to `text`.
    ///
    /// Holding fewer than `k` entries is not an error: all of them are
    /// returned.
    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// The `limit` most recent entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<MemoryEntry>, MemoryError>;

    /// Get total entry count.
    async fn count(&self) -> Result<usize, MemoryError>;

    /// Remove every entry.
    async fn clear(&self) -> Result<(), MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_has_id_and_no_score() {
        let entry = MemoryEntry::new("reverse a list", "xs[::-1]");
        assert!(!entry.id.is_empty());
        assert_eq!(entry.score, 0.0);
        assert!(entry.embedding.is_none());
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let entry = MemoryEntry::new("sort a dict by value", "sorted(d.items(), key=...)")
            .with_metadata("status", "success")
            .with_metadata("iterations", 2);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"status\":\"success\""));
        assert!(!json.contains("embedding"));

        let back: MemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.metadata["iterations"], 2);
        assert_eq!(back.query, "sort a dict by value");
    }
}
