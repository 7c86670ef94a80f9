//! OpenAI-compatible backend: chat completions for generation, the
//! embeddings endpoint for vectors. Works against any provider that
//! speaks the same wire format (OpenAI, Groq, Together, local servers).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;
use crate::provider::{IntentPrediction, LlmProvider};

const CLASSIFY_PROMPT: &str = "Classify the intent of the following documentation question. \
     Respond with JSON only: {\"label\": \"<general|howto|troubleshooting|reference>\", \
     \"confidence\": <0.0-1.0>}.\n\nQuestion: ";

const EXPAND_PROMPT: &str = "Rephrase the following documentation question in up to three \
     alternative ways that could match different wording in the docs. \
     Respond with a JSON array of strings only.\n\nQuestion: ";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    embedding_model: String,
    max_tokens: u32,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl Clone for OpenAiProvider {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            embedding_model: self.embedding_model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(
        api_key: String,
        mut base_url: String,
        model: String,
        embedding_model: String,
        max_tokens: u32,
    ) -> Self {
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: crate::http::default_client(),
            api_key,
            base_url,
            model,
            embedding_model,
            max_tokens,
        }
    }

    #[must_use]
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn send_chat(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: &[ApiMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            tracing::error!("chat API error {status}: {text}");
            return Err(LlmError::Other(format!(
                "chat request failed (status {status})"
            )));
        }

        let resp: ChatResponse = serde_json::from_str(&text)?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }
}

impl LlmProvider for OpenAiProvider {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.send_chat(prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let input = [text.to_owned()];
        let vectors = self.embed_batch(&input).await?;
        vectors
            .into_iter()
            .next()
            .flatten()
            .ok_or(LlmError::EmptyResponse { provider: "openai" })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Option<Vec<f32>>>, LlmError> {
        let body = EmbeddingRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.map_err(LlmError::Http)?;

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            tracing::error!("embeddings API error {status}: {text}");
            return Err(LlmError::Other(format!(
                "embeddings request failed (status {status})"
            )));
        }

        let resp: EmbeddingResponse = serde_json::from_str(&text)?;

        // The API returns one datum per input, indexed; keep positional order.
        let mut out: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for datum in resp.data {
            if let Some(slot) = out.get_mut(datum.index) {
                *slot = Some(datum.embedding);
            }
        }
        Ok(out)
    }

    async fn classify_intent(&self, query: &str) -> Result<IntentPrediction, LlmError> {
        let response = self.send_chat(&format!("{CLASSIFY_PROMPT}{query}")).await?;
        parse_intent(&response)
            .ok_or_else(|| LlmError::StructuredParse(format!("intent response: {response}")))
    }

    async fn expand(&self, query: &str) -> Result<Vec<String>, LlmError> {
        let response = self.send_chat(&format!("{EXPAND_PROMPT}{query}")).await?;
        let mut variants = parse_string_array(&response)
            .ok_or_else(|| LlmError::StructuredParse(format!("expansion response: {response}")))?;
        variants.truncate(3);
        Ok(variants)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Strip Markdown code fences that chat models like to wrap JSON in.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn parse_intent(text: &str) -> Option<IntentPrediction> {
    let value: serde_json::Value = serde_json::from_str(strip_fences(text)).ok()?;
    let label = value.get("label")?.as_str()?.to_owned();
    #[allow(clippy::cast_possible_truncation)]
    let confidence = value.get("confidence")?.as_f64()? as f32;
    Some(IntentPrediction { label, confidence })
}

fn parse_string_array(text: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(strip_fences(text)).ok()?;
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
    )
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ApiMessage<'a>],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_provider() -> OpenAiProvider {
        OpenAiProvider::new(
            "key".into(),
            "https://api.example.com/v1/".into(),
            "gpt-4o-mini".into(),
            "text-embedding-3-small".into(),
            1024,
        )
    }

    #[test]
    fn base_url_trailing_slashes_stripped() {
        let p = test_provider();
        assert_eq!(p.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn debug_redacts_api_key() {
        let dbg = format!("{:?}", test_provider());
        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("key\""));
    }

    #[test]
    fn parse_intent_plain_json() {
        let pred = parse_intent(r#"{"label": "how_to", "confidence": 0.8}"#).unwrap();
        assert_eq!(pred.label, "how_to");
        assert!((pred.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn parse_intent_fenced_json() {
        let text = "```json\n{\"label\": \"general\", \"confidence\": 0.5}\n```";
        let pred = parse_intent(text).unwrap();
        assert_eq!(pred.label, "general");
    }

    #[test]
    fn parse_intent_garbage_is_none() {
        assert!(parse_intent("I think it is a how-to question.").is_none());
    }

    #[test]
    fn parse_string_array_filters_non_strings() {
        let variants = parse_string_array(r#"["one", 2, "three"]"#).unwrap();
        assert_eq!(variants, vec!["one".to_owned(), "three".to_owned()]);
    }

    #[test]
    fn strip_fences_handles_bare_text() {
        assert_eq!(strip_fences("  [1]  "), "[1]");
        assert_eq!(strip_fences("```\n[]\n```"), "[]");
    }
}
