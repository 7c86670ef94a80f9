//! `docent.toml` configuration with environment fallbacks.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use docent_index::{ChunkerConfig, IndexerConfig};
use docent_query::{RetryPolicy, WorkflowConfig};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Corpus root walked for Markdown files.
    pub corpus_dir: PathBuf,
    /// JSON snapshot location.
    pub snapshot_path: PathBuf,
    pub provider: ProviderConfig,
    pub chunker: ChunkerSection,
    pub indexer: IndexerSection,
    pub query: QuerySection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    /// Falls back to `DOCENT_API_KEY`, then `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkerSection {
    pub threshold_chars: usize,
    pub window_words: usize,
    pub overlap_words: usize,
    pub edit_url_base: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerSection {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySection {
    pub min_score: f32,
    pub high_confidence_hits: usize,
    pub max_context_hits: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("docs"),
            snapshot_path: PathBuf::from(".docent/index.json"),
            provider: ProviderConfig::default(),
            chunker: ChunkerSection::default(),
            indexer: IndexerSection::default(),
            query: QuerySection::default(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            embedding_model: "text-embedding-3-small".into(),
            api_key: None,
            max_tokens: 1024,
        }
    }
}

impl Default for ChunkerSection {
    fn default() -> Self {
        let d = ChunkerConfig::default();
        Self {
            threshold_chars: d.threshold_chars,
            window_words: d.window_words,
            overlap_words: d.overlap_words,
            edit_url_base: d.edit_url_base,
        }
    }
}

impl Default for IndexerSection {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_delay_ms: 200,
        }
    }
}

impl Default for QuerySection {
    fn default() -> Self {
        let d = WorkflowConfig::default();
        Self {
            min_score: d.min_score,
            high_confidence_hits: d.high_confidence_hits,
            max_context_hits: d.max_context_hits,
            retry_attempts: d.retry.max_attempts,
            retry_delay_ms: u64::try_from(d.retry.delay.as_millis()).unwrap_or(250),
        }
    }
}

impl Config {
    /// Load from a TOML file, or defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Fails on an unreadable or malformed file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// The API key, preferring the config file over the environment.
    ///
    /// # Errors
    ///
    /// Fails when no key is configured anywhere.
    pub fn api_key(&self) -> anyhow::Result<String> {
        if let Some(key) = &self.provider.api_key {
            return Ok(key.clone());
        }
        std::env::var("DOCENT_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .context("no API key: set provider.api_key, DOCENT_API_KEY, or OPENAI_API_KEY")
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            threshold_chars: self.chunker.threshold_chars,
            window_words: self.chunker.window_words,
            overlap_words: self.chunker.overlap_words,
            edit_url_base: self.chunker.edit_url_base.clone(),
        }
    }

    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig {
            snapshot_path: self.snapshot_path.clone(),
            batch_size: self.indexer.batch_size,
            batch_delay: Duration::from_millis(self.indexer.batch_delay_ms),
            chunker: self.chunker_config(),
        }
    }

    #[must_use]
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            min_score: self.query.min_score,
            high_confidence_hits: self.query.high_confidence_hits,
            max_context_hits: self.query.max_context_hits,
            retry: RetryPolicy::new(
                self.query.retry_attempts,
                Duration::from_millis(self.query.retry_delay_ms),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("docent.toml")).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("docs"));
        assert_eq!(config.indexer.batch_size, 10);
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docent.toml");
        std::fs::write(
            &path,
            "corpus_dir = \"content\"\n\n[query]\nmin_score = 0.5\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.corpus_dir, PathBuf::from("content"));
        assert!((config.query.min_score - 0.5).abs() < f32::EPSILON);
        // untouched sections keep their defaults
        assert_eq!(config.chunker.threshold_chars, 1000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docent.toml");
        std::fs::write(&path, "corpus_dir = [not toml").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
