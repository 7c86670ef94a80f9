//! In-memory vector index with a JSON snapshot on disk.
//!
//! The store keeps chunks in insertion order alongside their embeddings
//! and a fingerprint table keyed by source file path. It is a plain
//! value: concurrency is the caller's concern (the query side holds it
//! behind a read lock and the indexer swaps in a rebuilt store only
//! after its snapshot has been persisted).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chunker::Chunk;
use crate::error::{IndexError, Result};

/// Snapshot format version; bumped on incompatible layout changes.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

/// Chunks, embeddings, and per-file fingerprints.
#[derive(Debug, Clone, Default)]
pub struct IndexStore {
    entries: Vec<Entry>,
    /// Source file path -> content fingerprint, for change detection.
    fingerprints: BTreeMap<String, String>,
    /// Embedding dimensionality, fixed by the first insert.
    dim: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: Vec<Entry>,
    fingerprints: BTreeMap<String, String>,
}

impl IndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding dimensionality, `None` while the store is empty.
    #[must_use]
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    #[must_use]
    pub fn fingerprint(&self, file_path: &str) -> Option<&str> {
        self.fingerprints.get(file_path).map(String::as_str)
    }

    #[must_use]
    pub fn fingerprints(&self) -> &BTreeMap<String, String> {
        &self.fingerprints
    }

    /// Iterate chunks in insertion order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&Chunk, &[f32])> {
        self.entries
            .iter()
            .map(|e| (&e.chunk, e.embedding.as_slice()))
    }

    /// Append one chunk with its embedding.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] if the embedding length
    /// differs from the vectors already stored.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        match self.dim {
            Some(dim) if dim != embedding.len() => {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: embedding.len(),
                });
            }
            None => self.dim = Some(embedding.len()),
            Some(_) => {}
        }
        self.entries.push(Entry { chunk, embedding });
        Ok(())
    }

    /// Replace a file's chunk set wholesale and record its fingerprint.
    /// Chunks of other files are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DimensionMismatch`] on an inconsistent
    /// embedding; the file's previous chunks are already gone at that
    /// point, so callers should treat the store as needing a rebuild.
    pub fn apply_file(
        &mut self,
        file_path: &str,
        fingerprint: String,
        chunks: Vec<(Chunk, Vec<f32>)>,
    ) -> Result<()> {
        self.remove_file(file_path);
        for (chunk, embedding) in chunks {
            self.insert(chunk, embedding)?;
        }
        self.fingerprints.insert(file_path.to_owned(), fingerprint);
        Ok(())
    }

    /// Drop every chunk belonging to a file along with its fingerprint.
    pub fn remove_file(&mut self, file_path: &str) {
        self.entries.retain(|e| e.chunk.metadata.file_path != file_path);
        self.fingerprints.remove(file_path);
        if self.entries.is_empty() {
            self.dim = None;
        }
    }

    /// Drop a file's fingerprint but keep its chunks. Used when part of
    /// a file failed to embed: the stale chunks stay searchable and the
    /// missing fingerprint forces a retry on the next pass.
    pub fn invalidate_fingerprint(&mut self, file_path: &str) {
        self.fingerprints.remove(file_path);
    }

    /// Write the snapshot atomically: serialize to a sibling temp file,
    /// then rename over the target.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Persistence`] if serialization or any file
    /// operation fails. The previous snapshot on disk is left intact.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            entries: self.entries.clone(),
            fingerprints: self.fingerprints.clone(),
        };
        let json = serde_json::to_vec(&snapshot)
            .map_err(|e| IndexError::Persistence(format!("serialize snapshot: {e}")))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| IndexError::Persistence(format!("create {}: {e}", parent.display())))?;
        }

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| IndexError::Persistence(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| IndexError::Persistence(format!("rename to {}: {e}", path.display())))?;

        info!(
            path = %path.display(),
            chunks = self.entries.len(),
            files = self.fingerprints.len(),
            "index snapshot persisted"
        );
        Ok(())
    }

    /// Load a snapshot from disk. A missing file yields `None` (first
    /// run); a corrupt or version-incompatible file is an error.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::Persistence`] on unreadable or
    /// incompatible snapshots.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let json = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no index snapshot");
                return Ok(None);
            }
            Err(e) => {
                return Err(IndexError::Persistence(format!(
                    "read {}: {e}",
                    path.display()
                )));
            }
        };
        let snapshot: Snapshot = serde_json::from_slice(&json)
            .map_err(|e| IndexError::Persistence(format!("parse {}: {e}", path.display())))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(IndexError::Persistence(format!(
                "snapshot version {} unsupported (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        let dim = snapshot.entries.first().map(|e| e.embedding.len());
        if let Some(dim) = dim {
            for entry in &snapshot.entries {
                if entry.embedding.len() != dim {
                    return Err(IndexError::Persistence(format!(
                        "snapshot has mixed embedding dimensions ({} vs {dim})",
                        entry.embedding.len()
                    )));
                }
            }
        }

        info!(
            path = %path.display(),
            chunks = snapshot.entries.len(),
            files = snapshot.fingerprints.len(),
            "index snapshot loaded"
        );
        Ok(Some(Self {
            entries: snapshot.entries,
            fingerprints: snapshot.fingerprints,
            dim,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{Chunker, ChunkerConfig};
    use crate::document::SourceDocument;

    fn chunk_for(path: &str, text: &str) -> Chunk {
        let doc = SourceDocument::parse(path, text);
        Chunker::new(ChunkerConfig::default())
            .chunk(&doc)
            .remove(0)
    }

    #[test]
    fn insert_fixes_dimensionality() {
        let mut store = IndexStore::new();
        store
            .insert(chunk_for("docs/a.md", "alpha"), vec![1.0, 0.0])
            .unwrap();
        assert_eq!(store.dim(), Some(2));

        let err = store
            .insert(chunk_for("docs/b.md", "beta"), vec![1.0, 0.0, 0.0])
            .unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn apply_file_replaces_only_that_file() {
        let mut store = IndexStore::new();
        store
            .apply_file(
                "docs/a.md",
                "fp-a".into(),
                vec![(chunk_for("docs/a.md", "old a"), vec![1.0, 0.0])],
            )
            .unwrap();
        store
            .apply_file(
                "docs/b.md",
                "fp-b".into(),
                vec![(chunk_for("docs/b.md", "b text"), vec![0.0, 1.0])],
            )
            .unwrap();

        store
            .apply_file(
                "docs/a.md",
                "fp-a2".into(),
                vec![(chunk_for("docs/a.md", "new a"), vec![0.5, 0.5])],
            )
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.fingerprint("docs/a.md"), Some("fp-a2"));
        assert_eq!(store.fingerprint("docs/b.md"), Some("fp-b"));
        let texts: Vec<&str> = store.chunks().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["b text", "new a"]);
    }

    #[test]
    fn remove_file_drops_chunks_and_fingerprint() {
        let mut store = IndexStore::new();
        store
            .apply_file(
                "docs/a.md",
                "fp".into(),
                vec![(chunk_for("docs/a.md", "a"), vec![1.0])],
            )
            .unwrap();
        store.remove_file("docs/a.md");
        assert!(store.is_empty());
        assert!(store.fingerprint("docs/a.md").is_none());
        assert_eq!(store.dim(), None);
    }

    #[test]
    fn invalidate_keeps_chunks() {
        let mut store = IndexStore::new();
        store
            .apply_file(
                "docs/a.md",
                "fp".into(),
                vec![(chunk_for("docs/a.md", "a"), vec![1.0])],
            )
            .unwrap();
        store.invalidate_fingerprint("docs/a.md");
        assert_eq!(store.len(), 1);
        assert!(store.fingerprint("docs/a.md").is_none());
    }

    #[test]
    fn snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut store = IndexStore::new();
        store
            .apply_file(
                "docs/a.md",
                "fp-a".into(),
                vec![(chunk_for("docs/a.md", "# A\n\nalpha text"), vec![0.1, 0.9])],
            )
            .unwrap();
        store
            .apply_file(
                "docs/b.md",
                "fp-b".into(),
                vec![(chunk_for("docs/b.md", "beta text"), vec![0.9, 0.1])],
            )
            .unwrap();
        store.persist(&path).unwrap();

        let loaded = IndexStore::load(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.dim(), store.dim());
        assert_eq!(loaded.fingerprints(), store.fingerprints());
        let a: Vec<&Chunk> = store.chunks().collect();
        let b: Vec<&Chunk> = loaded.chunks().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = IndexStore::load(&dir.path().join("absent.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_corrupt_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"{not json").unwrap();
        let err = IndexStore::load(&path).unwrap_err();
        assert!(matches!(err, IndexError::Persistence(_)));
    }

    #[test]
    fn persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        IndexStore::new().persist(&path).unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["index.json"]);
    }
}
