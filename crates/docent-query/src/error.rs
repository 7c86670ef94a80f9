//! Error types for docent-query.

/// Errors surfaced by workflow capabilities.
///
/// These never escape [`crate::workflow::QueryWorkflow::run`]: stages
/// either degrade around them or route to a fallback answer carrying
/// the error in the response metadata.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Embedding/generation adapter error.
    #[error("adapter error: {0}")]
    Adapter(#[from] docent_llm::LlmError),

    /// Index error, including search failures. Hard within a stage,
    /// never silently degraded.
    #[error("index error: {0}")]
    Index(#[from] docent_index::IndexError),
}

/// Result type alias using `WorkflowError`.
pub type Result<T> = std::result::Result<T, WorkflowError>;
