//! Provider abstraction for the remote embedding/generation service.
//!
//! The rest of the workspace talks to the AI provider only through the
//! [`provider::LlmProvider`] trait: plain text generation, single and
//! batch embeddings, intent classification, and query expansion. The
//! OpenAI-compatible backend in [`openai`] is the production
//! implementation; [`mock`] is a deterministic stand-in for tests.

pub mod error;
pub mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod openai;
pub mod provider;

pub use error::{LlmError, Result};
