//! Mutable state threaded through a single query run.

use docent_index::SearchHit;
use docent_llm::provider::IntentPrediction;

use crate::intent;
use crate::stage::StageId;

/// Everything accumulated across stages for one query. A plain value:
/// stages read and update it, nothing else holds onto it.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub query: String,
    pub intent: IntentPrediction,
    pub expansions: Vec<String>,
    /// Merged hits in descending score order.
    pub hits: Vec<SearchHit>,
    /// Stages that fell back to their degraded value.
    pub degraded: Vec<StageId>,
    /// First hard failure encountered, for the response metadata.
    pub error: Option<String>,
}

impl RunContext {
    #[must_use]
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_owned(),
            intent: intent::general(),
            expansions: Vec::new(),
            hits: Vec::new(),
            degraded: Vec::new(),
            error: None,
        }
    }

    pub fn mark_degraded(&mut self, stage: StageId) {
        if !self.degraded.contains(&stage) {
            self.degraded.push(stage);
        }
    }

    /// Merge new hits into the existing set, keeping the best score per
    /// chunk id and descending order.
    pub fn merge_hits(&mut self, new_hits: Vec<SearchHit>) {
        for hit in new_hits {
            match self.hits.iter_mut().find(|h| h.chunk.id == hit.chunk.id) {
                Some(existing) => {
                    if hit.score > existing.score {
                        existing.score = hit.score;
                    }
                }
                None => self.hits.push(hit),
            }
        }
        self.hits
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }

    #[must_use]
    pub fn top_score(&self) -> Option<f32> {
        self.hits.first().map(|h| h.score)
    }
}
