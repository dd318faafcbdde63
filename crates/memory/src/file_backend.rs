//! File-based store: persistent JSON-lines storage.
//!
//! One file per collection: `<dir>/<collection>.jsonl`. Each line is a
//! JSON-encoded `MemoryEntry`, embedding included, so similarity search
//! works across restarts without re-embedding.
//!
//! Entries are loaded into memory on open. Writes append a single line;
//! only `clear` rewrites the file.

use async_trait::async_trait;
use localagent_core::error::MemoryError;
use localagent_core::memory::{Embedder, MemoryEntry, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::embed::{embed_query, prepare_entry};
use crate::vector::{most_recent, rank};

/// A file-backed store using JSONL (one JSON object per line).
pub struct FileStore {
    path: PathBuf,
    entries: Arc<RwLock<Vec<MemoryEntry>>>,
    embedder: Arc<dyn Embedder>,
}

impl FileStore {
    /// Open the collection file under `dir`.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn open(dir: &Path, collection: &str, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let path = dir.join(format!("{}.jsonl", sanitize(collection)?));
        let entries = Self::load_from_disk(&path)?;
        debug!(path = %path.display(), count = entries.len(), "File memory store loaded");
        Ok(Self {
            path,
            entries: Arc::new(RwLock::new(entries)),
            embedder,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries from a JSONL file. Corrupted lines are skipped.
    fn load_from_disk(path: &Path) -> Result<Vec<MemoryEntry>, MemoryError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(MemoryError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        Ok(content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<MemoryEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted memory entry");
                    None
                }
            })
            .collect())
    }

    async fn ensure_parent(&self) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create memory directory: {e}"))
            })?;
        }
        Ok(())
    }
}

/// Collection names become file names; keep them to a safe alphabet.
fn sanitize(collection: &str) -> Result<&str, MemoryError> {
    let valid = !collection.is_empty()
        && collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        && !collection.starts_with('.');
    if valid {
        Ok(collection)
    } else {
        Err(MemoryError::Storage(format!(
            "Invalid collection name '{collection}'"
        )))
    }
}

#[async_trait]
impl MemoryStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, entry: MemoryEntry) -> Result<String, MemoryError> {
        let entry = prepare_entry(self.embedder.as_ref(), entry).await;
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| MemoryError::WriteFailed(format!("Failed to serialize memory entry: {e}")))?;
        line.push('\n');

        self.ensure_parent().await?;

        // Hold the lock across the append so file order matches memory order.
        let mut entries = self.entries.write().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MemoryError::WriteFailed(format!("Failed to open memory file: {e}")))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MemoryError::WriteFailed(format!("Failed to append memory entry: {e}")))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::WriteFailed(format!("Failed to flush memory file: {e}")))?;

        let id = entry.id.clone();
        entries.push(entry);
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
        let mut entries = self.entries.write().await;
        self.ensure_parent().await?;
        tokio::fs::write(&self.path, b"")
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to truncate memory file: {e}")))?;
        entries.clear();
        Ok(())
    }
}
