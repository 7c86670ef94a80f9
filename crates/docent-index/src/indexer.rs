//! Ingestion pipeline: scan, detect changes, chunk, embed, persist.
//!
//! Reconciliation is keyed by file path: a stale file's chunk set is
//! replaced wholesale, deleted files are dropped, unchanged files keep
//! their stored chunks and embeddings untouched. The rebuilt store is
//! handed back only after its snapshot has been persisted, so the
//! caller can swap it in knowing disk and memory agree.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use docent_llm::provider::LlmProvider;
use tracing::{info, warn};

use crate::change::{detect_changes, scan_corpus};
use crate::chunker::{Chunk, Chunker, ChunkerConfig};
use crate::error::Result;
use crate::store::IndexStore;

/// Indexer configuration.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Where the JSON snapshot lives.
    pub snapshot_path: PathBuf,
    /// Chunks embedded per provider call.
    pub batch_size: usize,
    /// Pause between embedding batches, for provider rate limits.
    pub batch_delay: Duration,
    pub chunker: ChunkerConfig,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(".docent/index.json"),
            batch_size: 10,
            batch_delay: Duration::from_millis(200),
            chunker: ChunkerConfig::default(),
        }
    }
}

/// Summary of one ingestion pass.
#[derive(Debug, Clone, Default)]
pub struct IndexReport {
    /// Markdown files found in the corpus.
    pub scanned: usize,
    /// Files skipped because their fingerprint matched.
    pub unchanged: usize,
    /// Files whose chunk set was (re)built.
    pub indexed: usize,
    /// Files dropped because they no longer exist on disk.
    pub removed: usize,
    /// Files where at least one chunk failed to embed. Their
    /// fingerprints are left unset so the next pass retries them.
    pub incomplete: usize,
    /// Chunks embedded during this pass.
    pub chunks_embedded: usize,
    /// Chunks in the store after the pass.
    pub total_chunks: usize,
    pub elapsed: Duration,
}

/// Drives the ingestion pipeline against an embedding provider.
pub struct Indexer<P> {
    provider: P,
    config: IndexerConfig,
}

impl<P: LlmProvider> Indexer<P> {
    pub fn new(provider: P, config: IndexerConfig) -> Self {
        Self { provider, config }
    }

    /// Run one ingestion pass over `corpus_root`, starting from
    /// `current` (pass an empty store, or set `rebuild`, to index from
    /// scratch). Returns the rebuilt store after its snapshot has been
    /// written.
    ///
    /// # Errors
    ///
    /// Per-file parse and embedding failures are contained. Errors
    /// propagated from here are fatal to the pass: an inaccessible
    /// corpus root, inconsistent embedding dimensions, or a failed
    /// snapshot write. On error the previous store and snapshot remain
    /// authoritative.
    pub async fn run(
        &self,
        corpus_root: &Path,
        current: &IndexStore,
        rebuild: bool,
    ) -> Result<(IndexStore, IndexReport)> {
        let started = Instant::now();
        let mut report = IndexReport::default();

        let docs = scan_corpus(corpus_root)?;
        report.scanned = docs.len();

        let mut next = if rebuild {
            IndexStore::new()
        } else {
            current.clone()
        };

        let changes = detect_changes(docs, &next);
        report.unchanged = changes.unchanged;

        for path in &changes.removed {
            next.remove_file(path);
            report.removed += 1;
        }

        let chunker = Chunker::new(self.config.chunker.clone());
        for doc in changes.stale {
            let chunks = chunker.chunk(&doc);
            let total = chunks.len();
            let embedded = self.embed_chunks(chunks).await;
            let complete = embedded.len() == total;

            report.chunks_embedded += embedded.len();
            next.apply_file(&doc.rel_path, doc.fingerprint.clone(), embedded)?;
            if complete {
                report.indexed += 1;
            } else {
                warn!(
                    path = %doc.rel_path,
                    "some chunks failed to embed; file will be retried next pass"
                );
                next.invalidate_fingerprint(&doc.rel_path);
                report.incomplete += 1;
            }
        }

        next.persist(&self.config.snapshot_path)?;

        report.total_chunks = next.len();
        report.elapsed = started.elapsed();
        info!(
            scanned = report.scanned,
            unchanged = report.unchanged,
            indexed = report.indexed,
            removed = report.removed,
            incomplete = report.incomplete,
            total_chunks = report.total_chunks,
            elapsed_ms = report.elapsed.as_millis(),
            "ingestion pass complete"
        );
        Ok((next, report))
    }

    /// Embed chunks in fixed-size batches with a pacing pause between
    /// calls. Chunks whose embedding failed are dropped from the
    /// result, whether one slot failed or the whole batch call did;
    /// either way the pass keeps going with the next batch.
    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Vec<(Chunk, Vec<f32>)> {
        let mut out = Vec::with_capacity(chunks.len());
        let mut first_batch = true;

        for batch in chunks.chunks(self.config.batch_size.max(1)) {
            if !first_batch && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            first_batch = false;

            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = match self.provider.embed_batch(&texts).await {
                Ok(vectors) => vectors,
                Err(e) => {
                    warn!(error = %e, chunks = batch.len(), "embedding batch failed; batch skipped");
                    continue;
                }
            };
            for (chunk, vector) in batch.iter().zip(vectors) {
                match vector {
                    Some(v) => out.push((chunk.clone(), v)),
                    None => warn!(chunk = %chunk.id, "chunk dropped: embedding failed"),
                }
            }
        }
        out
    }
}
