//! Corpus walking and fingerprint-based change detection.

use std::collections::BTreeSet;
use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::document::SourceDocument;
use crate::error::Result;
use crate::store::IndexStore;

/// Files whose stored fingerprint differs from (or is missing for) the
/// current corpus, plus files that disappeared from it.
#[derive(Debug, Default)]
pub struct ChangeSet {
    /// New or modified documents, in walk order.
    pub stale: Vec<SourceDocument>,
    /// Paths present in the store but no longer on disk.
    pub removed: Vec<String>,
    /// Files whose fingerprint matched; their stored chunks are kept.
    pub unchanged: usize,
}

impl ChangeSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stale.is_empty() && self.removed.is_empty()
    }
}

/// Walk the corpus root and parse every `.md`/`.mdx` file, respecting
/// ignore rules. Unreadable files are logged and skipped; the walk
/// continues. Results come back sorted by relative path so indexing
/// order is stable.
///
/// # Errors
///
/// Returns an IO error only if the root itself is inaccessible.
pub fn scan_corpus(root: &Path) -> Result<Vec<SourceDocument>> {
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("corpus root {} is not a directory", root.display()),
        )
        .into());
    }

    let mut docs = Vec::new();
    for entry in WalkBuilder::new(root).hidden(true).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !is_markdown(path) {
            continue;
        }
        let rel_path = match path.strip_prefix(root) {
            Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        match std::fs::read_to_string(path) {
            Ok(raw) => docs.push(SourceDocument::parse(&rel_path, &raw)),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }

    docs.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    debug!(root = %root.display(), files = docs.len(), "corpus scan complete");
    Ok(docs)
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md" | "mdx")
    )
}

/// Compare walked documents against the store's fingerprint table.
/// Detection is keyed purely by relative file path; a rename shows up
/// as one removal plus one stale document.
#[must_use]
pub fn detect_changes(docs: Vec<SourceDocument>, store: &IndexStore) -> ChangeSet {
    let current: BTreeSet<&str> = docs.iter().map(|d| d.rel_path.as_str()).collect();

    let removed: Vec<String> = store
        .fingerprints()
        .keys()
        .filter(|path| !current.contains(path.as_str()))
        .cloned()
        .collect();

    let mut stale = Vec::new();
    let mut unchanged = 0;
    for doc in docs {
        match store.fingerprint(&doc.rel_path) {
            Some(fp) if fp == doc.fingerprint => unchanged += 1,
            _ => stale.push(doc),
        }
    }

    ChangeSet {
        stale,
        removed,
        unchanged,
    }
}
