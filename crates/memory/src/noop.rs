//! No-op store: disables persistent memory entirely.

use async_trait::async_trait;
use localagent_core::error::MemoryError;
use localagent_core::memory::{MemoryEntry, MemoryStore};

/// A store that keeps nothing and recalls nothing.
pub struct NoopStore;

#[async_trait]
impl MemoryStore for NoopStore {
    fn name(&self) -> &str {
        "none"
    }

    async fn write(&self, entry: MemoryEntry) -> Result<String, MemoryError> {
        Ok(entry.id)
    }

    async fn query(&self, _text: &str, _k: usize) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<MemoryEntry>, MemoryError> {
        Ok(Vec::new())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(0)
    }

    async fn clear(&self) -> Result<(), MemoryError> {
        Ok(())
    }
}
