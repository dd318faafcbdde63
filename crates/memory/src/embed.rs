//! Local embedding without a model server.
//!
//! `HashEmbedder` uses the hashing trick: every word and every character
//! trigram is hashed (SHA-256) into one of `dims` buckets with a hashed
//! sign, and the result is L2-normalized. Identical text always maps to the
//! identical vector, and texts sharing vocabulary land close together.

use async_trait::async_trait;
use localagent_core::error::MemoryError;
use localagent_core::memory::{Embedder, MemoryEntry};
use sha2::{Digest, Sha256};
use tracing::warn;

pub struct HashEmbedder {
    dims: usize,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Synchronous core of `embed`.
    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| !w.is_empty())
        {
            self.accumulate(&mut vector, word.as_bytes(), 1.0);

            let chars: Vec<char> = format!("^{word}$").chars().collect();
            for gram in chars.windows(3) {
                let gram: String = gram.iter().collect();
                self.accumulate(&mut vector, gram.as_bytes(), 0.5);
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let digest = Sha256::digest(feature);
        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&digest[..8]);
        let index = (u64::from_le_bytes(bucket) % self.dims as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        vector[index] += sign * weight;
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(self.vectorize(text))
    }
}

/// Fill in the id and embedding an entry needs before it is stored.
///
/// An embedding failure does not block the write: the entry is kept
/// without a vector so history stays complete.
pub(crate) async fn prepare_entry(embedder: &dyn Embedder, mut entry: MemoryEntry) -> MemoryEntry {
    if entry.id.is_empty() {
        entry.id = uuid::Uuid::new_v4().to_string();
    }
    if entry.embedding.is_none() {
        match embedder.embed(&entry.query).await {
            Ok(vector) => entry.embedding = Some(vector),
            Err(e) => {
                warn!(id = %entry.id, embedder = embedder.name(), error = %e, "Storing memory without embedding")
            }
        }
    }
    entry
}

/// Embed query text for a similarity search.
pub(crate) async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, MemoryError> {
    embedder
        .embed(text)
        .await
        .map_err(|e| MemoryError::QueryFailed(e.to_string()))
}
