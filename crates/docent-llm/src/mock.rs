//! Test-only mock provider.

use std::sync::{Arc, Mutex};

use crate::error::LlmError;
use crate::provider::{IntentPrediction, LlmProvider};

#[derive(Debug, Clone)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<String>>>,
    pub default_response: String,
    pub embedding: Vec<f32>,
    pub intent: IntentPrediction,
    pub expansions: Vec<String>,
    pub fail_generate: bool,
    pub fail_embed: bool,
    pub fail_classify: bool,
    pub fail_expand: bool,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock response".into(),
            embedding: vec![0.0; 384],
            intent: IntentPrediction {
                label: "general".into(),
                confidence: 0.9,
            },
            expansions: Vec::new(),
            fail_generate: false,
            fail_embed: false,
            fail_classify: false,
            fail_expand: false,
            delay_ms: 0,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    /// A provider where every call fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_generate: true,
            fail_embed: true,
            fail_classify: true,
            fail_expand: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    #[must_use]
    pub fn with_intent(mut self, label: &str, confidence: f32) -> Self {
        self.intent = IntentPrediction {
            label: label.into(),
            confidence,
        };
        self
    }

    #[must_use]
    pub fn with_expansions(mut self, expansions: Vec<String>) -> Self {
        self.expansions = expansions;
        self
    }

    async fn maybe_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }
}

impl LlmProvider for MockProvider {
    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        self.maybe_delay().await;
        if self.fail_generate {
            return Err(LlmError::Other("mock generation error".into()));
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, LlmError> {
        self.maybe_delay().await;
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        Ok(self.embedding.clone())
    }

    async fn classify_intent(&self, _query: &str) -> Result<IntentPrediction, LlmError> {
        self.maybe_delay().await;
        if self.fail_classify {
            return Err(LlmError::Other("mock classification error".into()));
        }
        Ok(self.intent.clone())
    }

    async fn expand(&self, _query: &str) -> Result<Vec<String>, LlmError> {
        self.maybe_delay().await;
        if self.fail_expand {
            return Err(LlmError::Other("mock expansion error".into()));
        }
        Ok(self.expansions.clone())
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn responses_are_consumed_in_order() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(provider.generate("q").await.unwrap(), "first");
        assert_eq!(provider.generate("q").await.unwrap(), "second");
        assert_eq!(provider.generate("q").await.unwrap(), "mock response");
    }

    #[tokio::test]
    async fn failing_provider_fails_every_capability() {
        let provider = MockProvider::failing();
        assert!(provider.generate("q").await.is_err());
        assert!(provider.embed("q").await.is_err());
        assert!(provider.classify_intent("q").await.is_err());
        assert!(provider.expand("q").await.is_err());
    }

    #[tokio::test]
    async fn builder_methods_override_defaults() {
        let provider = MockProvider::default()
            .with_embedding(vec![1.0, 2.0])
            .with_intent("example", 0.7)
            .with_expansions(vec!["alt".into()]);

        assert_eq!(provider.embed("q").await.unwrap(), vec![1.0, 2.0]);
        assert_eq!(provider.classify_intent("q").await.unwrap().label, "example");
        assert_eq!(provider.expand("q").await.unwrap(), vec!["alt".to_owned()]);
    }
}
