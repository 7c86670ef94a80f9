use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Result of classifying a query's intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntentPrediction {
    pub label: String,
    pub confidence: f32,
}

/// Narrow contract to the remote embedding/generation service.
///
/// Every call may fail; callers own retry policy. Implementations must
/// return embeddings of a fixed dimensionality for the lifetime of the
/// provider instance.
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a plain-text prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Embed a single text into a fixed-dimension vector.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedding call fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed a batch of texts, tolerating individual failures.
    ///
    /// Each slot is `None` when that text's embedding failed; a failed
    /// slot is logged, not propagated, so one bad input cannot sink the
    /// whole batch.
    ///
    /// # Errors
    ///
    /// Returns an error only when the batch as a whole cannot be attempted.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Option<Vec<f32>>>, LlmError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                match self.embed(text).await {
                    Ok(vector) => out.push(Some(vector)),
                    Err(e) => {
                        tracing::warn!("batch embedding failed for one text: {e:#}");
                        out.push(None);
                    }
                }
            }
            Ok(out)
        }
    }

    /// Classify the intent of a user query.
    ///
    /// # Errors
    ///
    /// Returns an error if the classification call fails or the response is unparseable.
    fn classify_intent(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<IntentPrediction, LlmError>> + Send;

    /// Produce up to three alternative phrasings of a query.
    ///
    /// # Errors
    ///
    /// Returns an error if the expansion call fails.
    fn expand(&self, query: &str) -> impl Future<Output = Result<Vec<String>, LlmError>> + Send;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[tokio::test]
    async fn default_embed_batch_maps_each_text() {
        let mut provider = MockProvider::default();
        provider.embedding = vec![0.5, 0.5];
        let texts = vec!["one".to_owned(), "two".to_owned()];

        let vectors = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].as_deref(), Some([0.5, 0.5].as_slice()));
    }

    #[tokio::test]
    async fn default_embed_batch_tolerates_failures() {
        let provider = MockProvider::failing();
        let texts = vec!["one".to_owned()];

        let vectors = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors, vec![None]);
    }

    #[test]
    fn intent_prediction_roundtrips_through_json() {
        let pred = IntentPrediction {
            label: "troubleshooting".into(),
            confidence: 0.82,
        };
        let json = serde_json::to_string(&pred).unwrap();
        let back: IntentPrediction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pred);
    }
}
