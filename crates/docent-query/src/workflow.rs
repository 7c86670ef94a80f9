//! The staged query workflow: classify, expand, search, generate.
//!
//! `run` never returns an error. Classification and expansion degrade
//! around failures, a no-results search routes to a model-only
//! fallback, and any hard stage failure ends in an apology answer with
//! the error recorded in the metadata.

use std::time::Instant;

use tracing::{info, warn};

use crate::capability::QueryCapabilities;
use crate::context::RunContext;
use crate::error::WorkflowError;
use crate::intent::{self, keyword_intent};
use crate::metadata::{QueryMetadata, QueryResponse};
use crate::retry::RetryPolicy;
use crate::stage::{Route, StageId, StageOutcome, Transition, transition};

/// Adapter calls can fail transiently and are worth another attempt.
/// Index errors are deterministic, so a second attempt would only
/// repeat the same failure.
fn retryable(err: &WorkflowError) -> bool {
    matches!(err, WorkflowError::Adapter(_))
}

/// Terminal answer for unrecovered failures. References the query so
/// the reader knows which question went unanswered.
fn apology(query: &str) -> String {
    format!("Sorry, something went wrong while answering \"{query}\". Please try again.")
}

/// Workflow tuning.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Score a hit must reach to count toward high confidence. The
    /// exhaustive scan scores every chunk, so a raw hit count says
    /// nothing; only hits at or above this floor are evidence the
    /// corpus actually covers the question.
    pub min_score: f32,
    /// Strong hits needed to call the search high-confidence.
    pub high_confidence_hits: usize,
    /// Hits kept for the generation prompt after merging.
    pub max_context_hits: usize,
    pub retry: RetryPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            high_confidence_hits: 3,
            max_context_hits: 5,
            retry: RetryPolicy::default(),
        }
    }
}

/// Orchestrates one query at a time against a capability set.
pub struct QueryWorkflow<C> {
    caps: C,
    config: WorkflowConfig,
}

impl<C: QueryCapabilities> QueryWorkflow<C> {
    pub fn new(caps: C, config: WorkflowConfig) -> Self {
        Self { caps, config }
    }

    /// Run the full workflow for one query. Always produces an answer;
    /// failures along the way show up in the metadata, not as errors.
    pub async fn run(&self, query: &str) -> QueryResponse {
        let started = Instant::now();
        let mut ctx = RunContext::new(query);
        let mut stage = StageId::Classify;

        let route = loop {
            let outcome = match stage {
                StageId::Classify => self.classify_stage(&mut ctx).await,
                StageId::Expand => self.expand_stage(&mut ctx).await,
                StageId::Search => self.search_stage(&mut ctx).await,
                // Generation runs after routing; the loop never enters it.
                StageId::Generate => StageOutcome::Advanced,
            };
            match transition(stage, outcome) {
                Transition::Next(next) => stage = next,
                Transition::Generate(route) => break route,
                Transition::Done => break Route::FallbackError,
            }
        };

        ctx.hits.truncate(self.config.max_context_hits);
        let (answer, route) = self.generate(&mut ctx, route).await;

        let metadata = QueryMetadata::from_run(&ctx, route, &answer, started.elapsed());
        info!(
            intent = %metadata.intent,
            route = ?metadata.route,
            hits = metadata.sources.len(),
            elapsed_ms = metadata.elapsed_ms,
            "query complete"
        );
        QueryResponse { answer, metadata }
    }

    async fn classify_stage(&self, ctx: &mut RunContext) -> StageOutcome {
        if let Some(pred) = keyword_intent(&ctx.query) {
            ctx.intent = pred;
            return StageOutcome::Advanced;
        }
        let query = ctx.query.clone();
        match self
            .config
            .retry
            .run("classify", || self.caps.classify(&query))
            .await
        {
            Ok(pred) => {
                ctx.intent = pred;
                StageOutcome::Advanced
            }
            Err(_) => {
                ctx.intent = intent::general();
                ctx.mark_degraded(StageId::Classify);
                StageOutcome::Degraded
            }
        }
    }

    async fn expand_stage(&self, ctx: &mut RunContext) -> StageOutcome {
        let query = ctx.query.clone();
        match self
            .config
            .retry
            .run("expand", || self.caps.expand(&query))
            .await
        {
            Ok(mut expansions) => {
                expansions.truncate(3);
                ctx.expansions = expansions;
                StageOutcome::Advanced
            }
            Err(_) => {
                ctx.expansions.clear();
                ctx.mark_degraded(StageId::Expand);
                StageOutcome::Degraded
            }
        }
    }

    async fn search_stage(&self, ctx: &mut RunContext) -> StageOutcome {
        let query = ctx.query.clone();
        let hits = match self
            .config
            .retry
            .run_filtered("search", || self.caps.search(&query), retryable)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                ctx.error = Some(e.to_string());
                return StageOutcome::Failed;
            }
        };
        ctx.merge_hits(hits);

        // Expanded phrasings are part of the search, not a rescue pass:
        // their hits merge in (deduplicated by chunk id, best score
        // wins) before the outcome is judged. A failed expansion search
        // only costs that expansion's hits.
        for expansion in ctx.expansions.clone() {
            match self
                .config
                .retry
                .run_filtered("search-expansion", || self.caps.search(&expansion), retryable)
                .await
            {
                Ok(hits) => ctx.merge_hits(hits),
                Err(e) => warn!(expansion = %expansion, error = %e, "expansion search skipped"),
            }
        }

        self.search_outcome(ctx)
    }

    fn search_outcome(&self, ctx: &RunContext) -> StageOutcome {
        if ctx.hits.is_empty() {
            return StageOutcome::NoResults;
        }
        let strong = ctx
            .hits
            .iter()
            .filter(|h| h.score >= self.config.min_score)
            .count();
        if strong >= self.config.high_confidence_hits {
            StageOutcome::HighConfidence
        } else {
            StageOutcome::LowConfidence
        }
    }

    /// Produce the answer for the chosen route. Sourced routes generate
    /// from the retrieved chunks; the no-results route asks the model
    /// for an explicitly ungrounded answer; the error route, and any
    /// generation that exhausts its retries, terminates with an apology
    /// referencing the query.
    async fn generate(&self, ctx: &mut RunContext, route: Route) -> (String, Route) {
        let ctx_ref: &RunContext = ctx;
        let result = match route {
            Route::Sourced | Route::SourcedLow => {
                self.config
                    .retry
                    .run("generate", || self.caps.generate_with_sources(ctx_ref))
                    .await
            }
            Route::FallbackNoResults => {
                self.config
                    .retry
                    .run("generate", || self.caps.generate_fallback(ctx_ref))
                    .await
            }
            Route::FallbackError => return (apology(&ctx.query), route),
        };

        match result {
            Ok(answer) => (answer, route),
            Err(e) => {
                warn!(error = %e, "generation failed");
                ctx.error = Some(e.to_string());
                (apology(&ctx.query), Route::FallbackError)
            }
        }
    }
}
