//! Staged question answering over an indexed corpus.
//!
//! A query flows classify → expand → search → generate, driven by a
//! single routing table over tagged stage outcomes. Remote calls go
//! through the narrow [`capability::QueryCapabilities`] seam and a
//! uniform retry policy; failures degrade or route to fallbacks so the
//! caller always gets an answer with honest metadata.

pub mod capability;
pub mod context;
pub mod error;
pub mod intent;
pub mod metadata;
pub mod retry;
pub mod stage;
pub mod workflow;

pub use capability::{LiveCapabilities, QueryCapabilities};
pub use context::RunContext;
pub use error::{Result, WorkflowError};
pub use metadata::{QueryMetadata, QueryResponse, SourceRef};
pub use retry::RetryPolicy;
pub use stage::{Route, StageId, StageOutcome};
pub use workflow::{QueryWorkflow, WorkflowConfig};
