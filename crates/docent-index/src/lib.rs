//! Markdown corpus ingestion and in-memory vector search.
//!
//! The pipeline is scan → change-detect → chunk → embed → persist: the
//! corpus is walked for Markdown files, unchanged files (by content
//! fingerprint) are skipped, the rest are chunked and embedded, and the
//! resulting store is written to a JSON snapshot before it replaces the
//! live index. Search is an exhaustive cosine scan, which is the right
//! trade for corpora of a few thousand chunks.

pub mod change;
pub mod chunker;
pub mod document;
pub mod error;
pub mod indexer;
pub mod search;
pub mod store;

pub use chunker::{Chunk, ChunkKind, ChunkMetadata, Chunker, ChunkerConfig};
pub use error::{IndexError, Result};
pub use indexer::{IndexReport, Indexer, IndexerConfig};
pub use search::{SearchHit, cosine_similarity};
pub use store::IndexStore;

use std::sync::{Arc, RwLock};

/// Live index handle: many concurrent readers on the query path, one
/// writer that swaps in a rebuilt store after persisting it.
pub type SharedIndex = Arc<RwLock<IndexStore>>;

/// Wrap a store for shared use.
#[must_use]
pub fn shared(store: IndexStore) -> SharedIndex {
    Arc::new(RwLock::new(store))
}

/// Swap a rebuilt store into the live handle. Readers see either the
/// old index or the new one, never a partial state. Recovers a
/// poisoned lock, since the store itself is always a consistent value.
pub fn swap(index: &SharedIndex, store: IndexStore) {
    match index.write() {
        Ok(mut guard) => *guard = store,
        Err(poisoned) => *poisoned.into_inner() = store,
    }
}
