//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use localagent_core::error::MemoryError;
use localagent_core::memory::{Embedder, MemoryEntry, MemoryStore};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embed::{embed_query, prepare_entry};
use crate::vector::{most_recent, rank};

/// A store that keeps entries in a Vec for the life of the process.
pub struct InMemoryStore {
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Arc<dyn Embedder>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            embedder,
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn write(&self, entry: MemoryEntry) -> Result<String, MemoryError> {
        // Embed before taking the lock; the embedder may be a network call.
        let entry = prepare_entry(self.embedder.as_ref(), entry).await;
        let id = entry.id.clone();
        self.entries.write().await.push(entry);
        Ok(id)
    }

    async fn query(&self, text: &str, k: usize) -> Result<Vec<MemoryEntry>, MemoryError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_embedding = embed_query(self.embedder.as_ref(), text).await?;
        let entries = self.entries.read().await;
        Ok(rank(&entries, &query_embedding, k))
    }

    async fn recent(&self, limit: usize) -> Result<Vec<MemoryEntry>, MemoryError> {
        let entries = self.entries.read().await;
        Ok(most_recent(&entries, limit))
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.entries.read().await.len())
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        self.entries.write().await.clear();
        Ok(())
    }
}
