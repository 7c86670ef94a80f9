//! The capability seam between the workflow and the outside world.
//!
//! The workflow only sees this trait, so tests can drive every routing
//! path without a provider or an index on disk.

use docent_index::{SearchHit, SharedIndex};
use docent_llm::provider::{IntentPrediction, LlmProvider};
use tracing::debug;

use crate::context::RunContext;
use crate::error::{Result, WorkflowError};
use crate::intent;

/// The five operations a query run needs.
pub trait QueryCapabilities: Send + Sync {
    /// Classify the query's intent.
    ///
    /// # Errors
    ///
    /// Fails when the adapter call fails; the workflow degrades to the
    /// general intent.
    fn classify(&self, query: &str) -> impl Future<Output = Result<IntentPrediction>> + Send;

    /// Produce alternative phrasings of the query.
    ///
    /// # Errors
    ///
    /// Fails when the adapter call fails; the workflow degrades to zero
    /// expansions.
    fn expand(&self, query: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Embed `text` and score it against the index.
    ///
    /// # Errors
    ///
    /// Fails on adapter or index errors; the workflow treats this as a
    /// hard stage failure.
    fn search(&self, text: &str) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;

    /// Answer without sources, stating that the docs had nothing.
    ///
    /// # Errors
    ///
    /// Fails when the adapter call fails.
    fn generate_fallback(&self, ctx: &RunContext) -> impl Future<Output = Result<String>> + Send;

    /// Answer grounded in the retrieved sources.
    ///
    /// # Errors
    ///
    /// Fails when the adapter call fails.
    fn generate_with_sources(
        &self,
        ctx: &RunContext,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Production capabilities: an embedding/generation provider plus the
/// live index handle.
pub struct LiveCapabilities<P> {
    provider: P,
    index: SharedIndex,
    /// Hits requested per search call.
    pub top_k: usize,
}

impl<P: LlmProvider> LiveCapabilities<P> {
    pub fn new(provider: P, index: SharedIndex) -> Self {
        Self {
            provider,
            index,
            top_k: 8,
        }
    }
}

impl<P: LlmProvider> QueryCapabilities for LiveCapabilities<P> {
    async fn classify(&self, query: &str) -> Result<IntentPrediction> {
        Ok(self.provider.classify_intent(query).await?)
    }

    async fn expand(&self, query: &str) -> Result<Vec<String>> {
        Ok(self.provider.expand(query).await?)
    }

    async fn search(&self, text: &str) -> Result<Vec<SearchHit>> {
        let vector = self.provider.embed(text).await?;
        let hits = {
            let guard = self.index.read().map_err(|_| {
                WorkflowError::Index(docent_index::IndexError::Search(
                    "index lock poisoned".into(),
                ))
            })?;
            guard.search(&vector, self.top_k)?
        };
        debug!(text_len = text.len(), hits = hits.len(), "search capability");
        Ok(hits)
    }

    async fn generate_fallback(&self, ctx: &RunContext) -> Result<String> {
        let prompt = fallback_prompt(ctx);
        Ok(self.provider.generate(&prompt).await?)
    }

    async fn generate_with_sources(&self, ctx: &RunContext) -> Result<String> {
        let prompt = sourced_prompt(ctx);
        Ok(self.provider.generate(&prompt).await?)
    }
}

fn intent_guidance(label: &str) -> &'static str {
    match label {
        intent::HOWTO => "Give numbered steps the reader can follow.",
        intent::TROUBLESHOOTING => {
            "Identify the likely cause first, then the fix. Mention what to check if the fix does not apply."
        }
        intent::REFERENCE => "Answer precisely and include exact names, values, and defaults.",
        _ => "Answer directly and concisely.",
    }
}

fn sourced_prompt(ctx: &RunContext) -> String {
    let mut prompt = String::from(
        "You are answering a question about a documentation site. \
         Use only the excerpts below; if they do not cover something, say so.\n\n",
    );
    for (i, hit) in ctx.hits.iter().enumerate() {
        let m = &hit.chunk.metadata;
        prompt.push_str(&format!("--- Excerpt {} (from \"{}\"", i + 1, m.title));
        if let Some(heading) = &m.heading {
            prompt.push_str(&format!(", section \"{heading}\""));
        }
        prompt.push_str(") ---\n");
        prompt.push_str(&hit.chunk.text);
        prompt.push_str("\n\n");
    }
    prompt.push_str(intent_guidance(&ctx.intent.label));
    prompt.push_str(&format!("\n\nQuestion: {}\nAnswer:", ctx.query));
    prompt
}

fn fallback_prompt(ctx: &RunContext) -> String {
    format!(
        "You are answering a question about a documentation site, but no \
         relevant documentation was found for it. Answer from general \
         knowledge if you can, and be explicit that the documentation does \
         not cover this.\n\nQuestion: {}\nAnswer:",
        ctx.query
    )
}
