//! Memory store implementations for LocalAgent.
//!
//! Every store ranks by cosine similarity over embeddings produced by an
//! injected `Embedder`. `HashEmbedder` works offline; the providers crate
//! supplies an embedder backed by the model server.

pub mod embed;
pub mod file_backend;
pub mod in_memory;
pub mod noop;
pub mod vector;

pub use embed::HashEmbedder;
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
pub use noop::NoopStore;
pub use vector::{cosine_similarity, most_recent, rank};

use localagent_core::error::MemoryError;
use localagent_core::memory::{Embedder, MemoryStore};
use std::path::Path;
use std::sync::Arc;

/// Build a store by backend name: `file`, `in_memory` or `none`.
pub fn build_store(
    backend: &str,
    dir: &Path,
    collection: &str,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<dyn MemoryStore>, MemoryError> {
    let store: Arc<dyn MemoryStore> = match backend {
        "file" => Arc::new(FileStore::open(dir, collection, embedder)?),
        "in_memory" => Arc::new(InMemoryStore::new(embedder)),
        "none" => Arc::new(NoopStore),
        other => {
            return Err(MemoryError::Storage(format!(
                "Unknown memory backend '{other}'"
            )));
        }
    };
    tracing::debug!(backend = store.name(), "Memory store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_each_backend() {
        let dir = tempfile::tempdir().unwrap();
        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::default());
        for (name, expected) in [("file", "file"), ("in_memory", "in_memory"), ("none", "none")] {
            let store = build_store(name, dir.path(), "history", embedder.clone()).unwrap();
            assert_eq!(store.name(), expected);
        }
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_store("redis", dir.path(), "history", Arc::new(HashEmbedder::default()));
        assert!(result.is_err());
    }
}
