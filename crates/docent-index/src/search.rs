//! Exhaustive cosine-similarity search over the in-memory store.

use serde::Serialize;
use tracing::debug;

use crate::chunker::Chunk;
use crate::error::{IndexError, Result};
use crate::store::IndexStore;

/// One search result: a chunk and its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1]; 0.0 when either vector is zero.
    pub score: f32,
}

/// Cosine similarity between two vectors of equal length. Returns 0.0
/// when either vector has zero magnitude.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

impl IndexStore {
    /// Score every chunk against the query vector and return the top
    /// `top_k` hits in descending score order. Ties keep insertion
    /// order. An empty store yields an empty result, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Search`] if the query dimensionality does
    /// not match the stored vectors.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let Some(dim) = self.dim() else {
            return Ok(Vec::new());
        };
        if query.len() != dim {
            return Err(IndexError::Search(format!(
                "query dimension {} does not match index dimension {dim}",
                query.len()
            )));
        }

        let mut hits: Vec<SearchHit> = self
            .entries()
            .map(|(chunk, embedding)| SearchHit {
                chunk: chunk.clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        // Stable sort: equal scores keep store insertion order.
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        debug!(candidates = self.len(), returned = hits.len(), "search complete");
        Ok(hits)
    }
}
