//! The response envelope returned for every query.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::context::RunContext;
use crate::stage::{Route, StageId};

/// One source the answer drew on.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub title: String,
    pub heading: Option<String>,
    pub url: String,
    pub score: f32,
}

/// Observability envelope attached to every answer, including
/// fallbacks. Serialized as-is for `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct QueryMetadata {
    pub intent: String,
    pub intent_confidence: f32,
    pub expansions: Vec<String>,
    pub route: Route,
    /// Stages that fell back to their degraded value.
    pub degraded: Vec<StageId>,
    pub sources: Vec<SourceRef>,
    pub top_score: Option<f32>,
    /// Hard failure carried by an error-fallback answer.
    pub error: Option<String>,
    /// Length of the answer text in characters.
    pub answer_chars: usize,
    /// Unix seconds at which the run finished.
    pub timestamp: u64,
    pub elapsed_ms: u64,
}

/// A complete answer: text plus how it was produced.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub metadata: QueryMetadata,
}

impl QueryMetadata {
    /// Build the envelope from a finished run. Sources are reported
    /// only for sourced routes; fallbacks cite nothing.
    #[must_use]
    pub fn from_run(ctx: &RunContext, route: Route, answer: &str, elapsed: Duration) -> Self {
        let sources = match route {
            Route::Sourced | Route::SourcedLow => ctx
                .hits
                .iter()
                .map(|h| SourceRef {
                    title: h.chunk.metadata.title.clone(),
                    heading: h.chunk.metadata.heading.clone(),
                    url: h.chunk.metadata.public_url.clone(),
                    score: h.score,
                })
                .collect(),
            Route::FallbackNoResults | Route::FallbackError => Vec::new(),
        };

        Self {
            intent: ctx.intent.label.clone(),
            intent_confidence: ctx.intent.confidence,
            expansions: ctx.expansions.clone(),
            route,
            degraded: ctx.degraded.clone(),
            sources,
            top_score: ctx.top_score(),
            error: ctx.error.clone(),
            answer_chars: answer.chars().count(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_index::SearchHit;
    use docent_index::document::SourceDocument;
    use docent_index::{Chunker, ChunkerConfig};

    fn ctx_with_hit() -> RunContext {
        let mut ctx = RunContext::new("q");
        let doc = SourceDocument::parse("docs/a.md", "# Alpha\n\ntext");
        let chunk = Chunker::new(ChunkerConfig::default()).chunk(&doc).remove(0);
        ctx.merge_hits(vec![SearchHit { chunk, score: 0.7 }]);
        ctx
    }

    #[test]
    fn sourced_route_reports_sources() {
        let meta = QueryMetadata::from_run(
            &ctx_with_hit(),
            Route::Sourced,
            "An answer.",
            Duration::from_millis(12),
        );
        assert_eq!(meta.sources.len(), 1);
        assert_eq!(meta.sources[0].title, "Alpha");
        assert_eq!(meta.sources[0].url, "/a");
        assert_eq!(meta.top_score, Some(0.7));
        assert_eq!(meta.elapsed_ms, 12);
    }

    #[test]
    fn fallback_routes_cite_nothing() {
        let meta = QueryMetadata::from_run(
            &ctx_with_hit(),
            Route::FallbackNoResults,
            "An answer.",
            Duration::from_millis(5),
        );
        assert!(meta.sources.is_empty());
    }

    #[test]
    fn answer_length_and_timestamp_are_recorded() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let meta = QueryMetadata::from_run(
            &ctx_with_hit(),
            Route::Sourced,
            "héllo",
            Duration::from_millis(1),
        );
        // chars, not bytes
        assert_eq!(meta.answer_chars, 5);
        assert!(meta.timestamp >= before);
    }

    #[test]
    fn metadata_serializes_to_json() {
        let meta = QueryMetadata::from_run(
            &ctx_with_hit(),
            Route::SourcedLow,
            "An answer.",
            Duration::from_millis(3),
        );
        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"route\":\"sourced_low\""));
        assert!(json.contains("\"answer_chars\":10"));
        assert!(json.contains("\"timestamp\":"));
    }
}
