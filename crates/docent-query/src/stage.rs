//! Stage identifiers, tagged outcomes, and the routing table.
//!
//! Routing lives in one total function over (stage, outcome) so every
//! path through the workflow is visible in a single match. Stages never
//! decide where to go next themselves.

use serde::Serialize;

/// The stages of a query run, in their nominal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Classify,
    Expand,
    Search,
    Generate,
}

/// What a stage reported when it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Completed normally.
    Advanced,
    /// Failed, but substituted its defined degraded value.
    Degraded,
    /// Search only: zero hits.
    NoResults,
    /// Search only: enough strong hits to answer from sources.
    HighConfidence,
    /// Search only: some hits, below the high-confidence bar.
    LowConfidence,
    /// Failed with no degraded value available.
    Failed,
}

/// How the final answer gets produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Answer grounded in retrieved sources.
    Sourced,
    /// Answer grounded in sources, flagged low-confidence.
    SourcedLow,
    /// No relevant sources; answer from the model alone.
    FallbackNoResults,
    /// A stage failed hard; answer from the model alone, error recorded
    /// in the response metadata.
    FallbackError,
}

/// Where to go after a stage reports its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Next(StageId),
    Generate(Route),
    Done,
}

/// The routing table. Total over (stage, outcome); combinations a stage
/// cannot legitimately produce route to the error fallback rather than
/// panicking.
#[must_use]
pub fn transition(stage: StageId, outcome: StageOutcome) -> Transition {
    use StageId::{Classify, Expand, Generate, Search};
    use StageOutcome::{Advanced, Degraded, Failed, HighConfidence, LowConfidence, NoResults};

    match (stage, outcome) {
        // Classification always moves on: failure degrades to the
        // general intent rather than ending the run.
        (Classify, Advanced | Degraded | Failed) => Transition::Next(Expand),

        // Expansion failure degrades to zero expansions.
        (Expand, Advanced | Degraded | Failed) => Transition::Next(Search),

        (Search, NoResults) => Transition::Generate(Route::FallbackNoResults),
        (Search, HighConfidence) => Transition::Generate(Route::Sourced),
        (Search, LowConfidence) => Transition::Generate(Route::SourcedLow),
        (Search, Failed) => Transition::Generate(Route::FallbackError),

        (Generate, _) => Transition::Done,

        // Outcomes these stages cannot produce.
        (Classify | Expand, NoResults | HighConfidence | LowConfidence)
        | (Search, Advanced | Degraded) => Transition::Generate(Route::FallbackError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_and_expand_always_advance() {
        for outcome in [
            StageOutcome::Advanced,
            StageOutcome::Degraded,
            StageOutcome::Failed,
        ] {
            assert_eq!(
                transition(StageId::Classify, outcome),
                Transition::Next(StageId::Expand)
            );
            assert_eq!(
                transition(StageId::Expand, outcome),
                Transition::Next(StageId::Search)
            );
        }
    }

    #[test]
    fn search_outcomes_pick_the_route() {
        assert_eq!(
            transition(StageId::Search, StageOutcome::NoResults),
            Transition::Generate(Route::FallbackNoResults)
        );
        assert_eq!(
            transition(StageId::Search, StageOutcome::HighConfidence),
            Transition::Generate(Route::Sourced)
        );
        assert_eq!(
            transition(StageId::Search, StageOutcome::LowConfidence),
            Transition::Generate(Route::SourcedLow)
        );
        assert_eq!(
            transition(StageId::Search, StageOutcome::Failed),
            Transition::Generate(Route::FallbackError)
        );
    }

    #[test]
    fn generate_always_finishes() {
        for outcome in [
            StageOutcome::Advanced,
            StageOutcome::Degraded,
            StageOutcome::Failed,
        ] {
            assert_eq!(transition(StageId::Generate, outcome), Transition::Done);
        }
    }

    #[test]
    fn impossible_pairs_route_to_error_fallback() {
        assert_eq!(
            transition(StageId::Classify, StageOutcome::NoResults),
            Transition::Generate(Route::FallbackError)
        );
        assert_eq!(
            transition(StageId::Search, StageOutcome::Advanced),
            Transition::Generate(Route::FallbackError)
        );
    }
}
