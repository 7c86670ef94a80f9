//! Error types for docent-index.

/// Errors that can occur during ingestion, indexing, and search.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading source files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable source file. Contained per file: the
    /// ingestion pass logs it and continues with the rest of the corpus.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Embedding/generation adapter error.
    #[error("adapter error: {0}")]
    Adapter(#[from] docent_llm::LlmError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot write failed. Fatal to the ingestion pass; the previous
    /// snapshot remains authoritative.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Index corrupt or unavailable. Hard failure, never retried.
    #[error("search failed: {0}")]
    Search(String),

    /// Embedding dimensionality differs from the vectors already stored.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
