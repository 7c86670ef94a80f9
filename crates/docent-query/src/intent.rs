//! Query intent labels and the keyword pre-classifier.
//!
//! Unambiguous phrasings are labeled locally so the common case skips
//! an adapter round-trip; everything else goes to the model, and on
//! failure the workflow degrades to [`GENERAL`].

use docent_llm::provider::IntentPrediction;

pub const HOWTO: &str = "howto";
pub const TROUBLESHOOTING: &str = "troubleshooting";
pub const REFERENCE: &str = "reference";
pub const GENERAL: &str = "general";

const HOWTO_MARKERS: &[&str] = &[
    "how do i",
    "how to",
    "how can i",
    "set up",
    "setup",
    "install",
    "configure",
    "getting started",
];

const TROUBLESHOOTING_MARKERS: &[&str] = &[
    "error",
    "fails",
    "failed",
    "failing",
    "broken",
    "doesn't work",
    "does not work",
    "not working",
    "crash",
    "panic",
    "stack trace",
    "fix",
];

const REFERENCE_MARKERS: &[&str] = &[
    "what is",
    "what are",
    "what does",
    "difference between",
    "list of",
    "reference",
    "api for",
    "signature",
    "default value",
];

/// Classify by keyword markers alone. Returns `None` when no marker
/// matches; troubleshooting markers win over how-to markers because
/// broken-setup questions usually contain both.
#[must_use]
pub fn keyword_intent(query: &str) -> Option<IntentPrediction> {
    let q = query.to_lowercase();
    let label = if TROUBLESHOOTING_MARKERS.iter().any(|m| q.contains(m)) {
        TROUBLESHOOTING
    } else if HOWTO_MARKERS.iter().any(|m| q.contains(m)) {
        HOWTO
    } else if REFERENCE_MARKERS.iter().any(|m| q.contains(m)) {
        REFERENCE
    } else {
        return None;
    };
    Some(IntentPrediction {
        label: label.to_owned(),
        confidence: 0.95,
    })
}

/// The degraded intent used when classification fails outright.
#[must_use]
pub fn general() -> IntentPrediction {
    IntentPrediction {
        label: GENERAL.to_owned(),
        confidence: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn howto_phrasings() {
        for q in ["How do I install the CLI?", "Set up logging", "how to deploy"] {
            assert_eq!(keyword_intent(q).unwrap().label, HOWTO, "{q}");
        }
    }

    #[test]
    fn troubleshooting_beats_howto() {
        let pred = keyword_intent("how to fix the install error").unwrap();
        assert_eq!(pred.label, TROUBLESHOOTING);
    }

    #[test]
    fn reference_phrasings() {
        for q in [
            "What is the default value of batch size?",
            "difference between snapshot and index",
        ] {
            assert_eq!(keyword_intent(q).unwrap().label, REFERENCE, "{q}");
        }
    }

    #[test]
    fn ambiguous_query_defers_to_model() {
        assert!(keyword_intent("tell me about chunking").is_none());
    }

    #[test]
    fn degraded_intent_has_zero_confidence() {
        let g = general();
        assert_eq!(g.label, GENERAL);
        assert_eq!(g.confidence, 0.0);
    }
}
