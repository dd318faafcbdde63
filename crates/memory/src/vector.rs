//! Vector similarity and ranking utilities shared by every store.

use localagent_core::memory::MemoryEntry;
use std::cmp::Ordering;

/// Score given to entries stored without an embedding.
pub const UNEMBEDDED_SCORE: f32 = -1.0;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank every entry against a query embedding and keep the best `k`.
///
/// Entries without an embedding are still candidates, scored
/// `UNEMBEDDED_SCORE`, so a store holding fewer than `k` entries returns
/// all of them. Equal scores are ordered newest first.
pub fn rank(entries: &[MemoryEntry], query_embedding: &[f32], k: usize) -> Vec<MemoryEntry> {
    let mut scored: Vec<MemoryEntry> = entries
        .iter()
        .map(|entry| {
            let mut e = entry.clone();
            e.score = entry
                .embedding
                .as_deref()
                .map(|emb| cosine_similarity(emb, query_embedding))
                .unwrap_or(UNEMBEDDED_SCORE);
            e
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
    scored.truncate(k);
    scored
}

/// The `limit` newest entries, newest first.
pub fn most_recent(entries: &[MemoryEntry], limit: usize) -> Vec<MemoryEntry> {
    let mut recent: Vec<MemoryEntry> = entries.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(limit);
    recent
}
