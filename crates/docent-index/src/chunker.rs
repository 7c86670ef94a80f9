//! Heading-aware Markdown chunking with a sliding-window split for
//! oversized sections.

use std::collections::HashMap;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::document::{SourceDocument, edit_url, public_url};

/// How a chunk relates to its owning document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    /// The entire document fit under the size threshold.
    FullDocument,
    /// One top-level heading section.
    Section,
    /// A deeper heading section, or one window of an oversized section.
    Subsection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_path: String,
    pub file_name: String,
    /// Fingerprint of the owning file, not of the chunk text.
    pub fingerprint: String,
    pub title: String,
    pub heading: Option<String>,
    pub kind: ChunkKind,
    /// Position within a sliding window split, when applicable.
    pub window_index: Option<usize>,
    pub word_count: usize,
    /// Heading texts of the whole owning document, in order.
    pub outline: Vec<String>,
    pub code_languages: Vec<String>,
    pub internal_links: Vec<String>,
    pub external_links: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub public_url: String,
    pub edit_url: String,
}

/// One retrievable unit of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: derived from file path and section heading,
    /// stable across rebuilds while those are unchanged.
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Chunker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Size threshold T in characters; content at or under it becomes a
    /// single chunk (default: 1000).
    pub threshold_chars: usize,
    /// Sliding window length in words for oversized sections (default: 180).
    pub window_words: usize,
    /// Words shared between consecutive windows, roughly 200 characters
    /// worth (default: 40).
    pub overlap_words: usize,
    /// Repository path template for edit URLs.
    pub edit_url_base: String,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            threshold_chars: 1000,
            window_words: 180,
            overlap_words: 40,
            edit_url_base: "https://github.com/docent-rs/docs/edit/main".into(),
        }
    }
}

/// Splits normalized documents into ordered chunks. Pure and
/// deterministic: identical input content yields identical chunks.
#[derive(Debug, Clone, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

struct Section {
    heading: Option<String>,
    level: u8,
    text: String,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Chunk one document. An empty normalized document yields zero
    /// chunks; callers treat that as a no-op, not an error.
    #[must_use]
    pub fn chunk(&self, doc: &SourceDocument) -> Vec<Chunk> {
        if doc.content.is_empty() {
            return Vec::new();
        }

        let base = self.base_metadata(doc);
        let path_id = id_stem(&doc.rel_path);

        if doc.content.chars().count() <= self.config.threshold_chars {
            return vec![make_chunk(
                path_id.to_owned(),
                doc.content.clone(),
                &base,
                None,
                ChunkKind::FullDocument,
                None,
            )];
        }

        let mut chunks = Vec::new();
        let mut seen_ids: HashMap<String, usize> = HashMap::new();

        for section in split_sections(&doc.content) {
            let slug = section
                .heading
                .as_deref()
                .map_or_else(|| "intro".to_owned(), slugify);
            let mut section_id = format!("{path_id}#{slug}");

            // Duplicate heading texts get a sequence suffix so ids stay unique.
            let n = seen_ids.entry(section_id.clone()).or_insert(0);
            *n += 1;
            if *n > 1 {
                section_id = format!("{section_id}-{n}");
            }

            let kind = if section.level <= 2 {
                ChunkKind::Section
            } else {
                ChunkKind::Subsection
            };

            if section.text.chars().count() <= self.config.threshold_chars {
                chunks.push(make_chunk(
                    section_id,
                    section.text,
                    &base,
                    section.heading.clone(),
                    kind,
                    None,
                ));
            } else {
                let words: Vec<&str> = section.text.split_whitespace().collect();
                for (i, window) in
                    sliding_windows(&words, self.config.window_words, self.config.overlap_words)
                        .into_iter()
                        .enumerate()
                {
                    chunks.push(make_chunk(
                        format!("{section_id}/{i}"),
                        window,
                        &base,
                        section.heading.clone(),
                        ChunkKind::Subsection,
                        Some(i),
                    ));
                }
            }
        }

        chunks
    }

    fn base_metadata(&self, doc: &SourceDocument) -> ChunkMetadata {
        let analysis = analyze(&doc.content);
        ChunkMetadata {
            file_path: doc.rel_path.clone(),
            file_name: doc.file_name.clone(),
            fingerprint: doc.fingerprint.clone(),
            title: doc.title(),
            heading: None,
            kind: ChunkKind::FullDocument,
            window_index: None,
            word_count: 0,
            outline: analysis.outline,
            code_languages: analysis.code_languages,
            internal_links: analysis.internal_links,
            external_links: analysis.external_links,
            category: doc.front_matter.category.clone(),
            tags: doc.front_matter.tags.clone(),
            public_url: public_url(&doc.rel_path),
            edit_url: edit_url(&doc.rel_path, &self.config.edit_url_base),
        }
    }
}

fn make_chunk(
    id: String,
    text: String,
    base: &ChunkMetadata,
    heading: Option<String>,
    kind: ChunkKind,
    window_index: Option<usize>,
) -> Chunk {
    let word_count = text.split_whitespace().count();
    let mut metadata = base.clone();
    metadata.heading = heading;
    metadata.kind = kind;
    metadata.window_index = window_index;
    metadata.word_count = word_count;
    Chunk { id, text, metadata }
}

#[derive(Default)]
struct Analysis {
    outline: Vec<String>,
    code_languages: Vec<String>,
    internal_links: Vec<String>,
    external_links: Vec<String>,
}

/// Single pulldown-cmark pass collecting document-level metadata.
fn analyze(content: &str) -> Analysis {
    let mut analysis = Analysis::default();
    let mut heading_text: Option<String> = None;

    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::Heading { .. }) => heading_text = Some(String::new()),
            Event::Text(t) | Event::Code(t) => {
                if let Some(h) = heading_text.as_mut() {
                    h.push_str(&t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(h) = heading_text.take() {
                    analysis.outline.push(h.trim().to_owned());
                }
            }
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                let lang = lang.split_whitespace().next().unwrap_or("").to_owned();
                if !lang.is_empty() && !analysis.code_languages.contains(&lang) {
                    analysis.code_languages.push(lang);
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                let url = dest_url.to_string();
                if url.starts_with("http://") || url.starts_with("https://") {
                    analysis.external_links.push(url);
                } else {
                    analysis.internal_links.push(url);
                }
            }
            _ => {}
        }
    }
    analysis
}

/// Split content at every heading boundary: each segment is the heading
/// plus its body up to the next heading. Content before the first
/// heading becomes an unlabeled leading section.
fn split_sections(content: &str) -> Vec<Section> {
    let mut boundaries: Vec<(usize, u8, String)> = Vec::new();
    let mut heading_text: Option<String> = None;
    let mut heading_start = 0usize;
    let mut heading_level = 1u8;

    for (event, range) in Parser::new(content).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading_start = range.start;
                heading_level = level as u8;
                heading_text = Some(String::new());
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some(h) = heading_text.as_mut() {
                    h.push_str(&t);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(h) = heading_text.take() {
                    boundaries.push((heading_start, heading_level, h.trim().to_owned()));
                }
            }
            _ => {}
        }
    }

    let mut sections = Vec::new();

    let preamble_end = boundaries.first().map_or(content.len(), |b| b.0);
    let preamble = content[..preamble_end].trim();
    if !preamble.is_empty() {
        sections.push(Section {
            heading: None,
            level: 1,
            text: preamble.to_owned(),
        });
    }

    for (i, (start, level, heading)) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).map_or(content.len(), |b| b.0);
        let text = content[*start..end].trim();
        if text.is_empty() {
            continue;
        }
        sections.push(Section {
            heading: Some(heading.clone()),
            level: *level,
            text: text.to_owned(),
        });
    }

    sections
}

/// Fixed-size sliding window over words with a fixed word overlap
/// between consecutive windows.
fn sliding_windows(words: &[&str], window: usize, overlap: usize) -> Vec<String> {
    let step = window.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + window).min(words.len());
        out.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }
    out
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_owned()
}

fn id_stem(rel_path: &str) -> &str {
    rel_path
        .strip_suffix(".mdx")
        .or_else(|| rel_path.strip_suffix(".md"))
        .unwrap_or(rel_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(rel_path: &str, raw: &str) -> SourceDocument {
        SourceDocument::parse(rel_path, raw)
    }

    fn default_chunker() -> Chunker {
        Chunker::new(ChunkerConfig::default())
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let chunks = default_chunker().chunk(&doc("docs/a.md", ""));
        assert!(chunks.is_empty());
    }

    #[test]
    fn small_document_single_full_chunk() {
        let raw = "# Title\n\nShort body.";
        let d = doc("docs/a.md", raw);
        let chunks = default_chunker().chunk(&d);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.kind, ChunkKind::FullDocument);
        assert_eq!(chunks[0].text, d.content);
        assert_eq!(chunks[0].id, "docs/a");
    }

    #[test]
    fn sections_chunked_in_heading_order() {
        let mut raw = String::new();
        for name in ["Alpha", "Beta", "Gamma"] {
            raw.push_str(&format!("## {name}\n\n{}\n\n", "body text ".repeat(45)));
        }
        let chunks = default_chunker().chunk(&doc("docs/multi.md", &raw));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].metadata.heading.as_deref(), Some("Alpha"));
        assert_eq!(chunks[1].metadata.heading.as_deref(), Some("Beta"));
        assert_eq!(chunks[2].metadata.heading.as_deref(), Some("Gamma"));
        for c in &chunks {
            assert_eq!(c.metadata.kind, ChunkKind::Section);
        }
    }

    #[test]
    fn deep_headings_are_subsections() {
        let raw = format!(
            "## Top\n\n{}\n\n### Deep\n\n{}\n",
            "words ".repeat(200),
            "more words here ".repeat(70)
        );
        let chunks = default_chunker().chunk(&doc("docs/deep.md", &raw));
        let deep = chunks
            .iter()
            .find(|c| c.metadata.heading.as_deref() == Some("Deep"))
            .unwrap();
        assert_eq!(deep.metadata.kind, ChunkKind::Subsection);
    }

    #[test]
    fn oversized_section_window_count_and_overlap() {
        let config = ChunkerConfig {
            threshold_chars: 100,
            window_words: 40,
            overlap_words: 10,
            ..ChunkerConfig::default()
        };
        let n = 130usize;
        let body: String = (0..n).map(|i| format!("w{i} ")).collect();
        let raw = format!("## Big\n{body}");
        let d = doc("docs/big.md", &raw);
        let chunks = Chunker::new(config).chunk(&d);

        // heading tokens ("##", "Big") count as words too
        let total_words = n + 2;
        let expected = (total_words - 10).div_ceil(40 - 10);
        assert_eq!(chunks.len(), expected);

        for (i, pair) in chunks.windows(2).enumerate() {
            let left: Vec<&str> = pair[0].text.split_whitespace().collect();
            let right: Vec<&str> = pair[1].text.split_whitespace().collect();
            assert_eq!(
                left[left.len() - 10..],
                right[..10],
                "windows {i} and {} must share the overlap",
                i + 1
            );
        }

        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.metadata.window_index, Some(i));
            assert_eq!(c.metadata.kind, ChunkKind::Subsection);
            assert_eq!(c.id, format!("docs/big#big/{i}"));
        }
    }

    #[test]
    fn duplicate_headings_get_distinct_ids() {
        let raw = format!(
            "## Usage\n\n{}\n\n## Usage\n\n{}\n",
            "first body ".repeat(60),
            "second body ".repeat(60)
        );
        let chunks = default_chunker().chunk(&doc("docs/dup.md", &raw));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "docs/dup#usage");
        assert_eq!(chunks[1].id, "docs/dup#usage-2");
    }

    #[test]
    fn preamble_before_first_heading_kept() {
        let raw = format!(
            "Intro paragraph before any heading.\n\n## First\n\n{}\n",
            "body ".repeat(250)
        );
        let chunks = default_chunker().chunk(&doc("docs/pre.md", &raw));
        assert!(chunks[0].id.ends_with("#intro"));
        assert!(chunks[0].text.starts_with("Intro paragraph"));
    }

    #[test]
    fn metadata_derivation() {
        let raw = format!(
            "---\ntitle: Guide\ncategory: howto\ntags: [a, b]\n---\n\n# Guide\n\nSee [other](../other.md) and [ext](https://example.com).\n\n```rust\nfn main() {{}}\n```\n\n{}",
            "pad ".repeat(300)
        );
        let chunks = default_chunker().chunk(&doc("docs/guides/guide.md", &raw));
        assert!(!chunks.is_empty());
        let m = &chunks[0].metadata;
        assert_eq!(m.title, "Guide");
        assert_eq!(m.category.as_deref(), Some("howto"));
        assert_eq!(m.tags, vec!["a", "b"]);
        assert_eq!(m.outline, vec!["Guide"]);
        assert_eq!(m.code_languages, vec!["rust"]);
        assert_eq!(m.internal_links, vec!["../other.md"]);
        assert_eq!(m.external_links, vec!["https://example.com"]);
        assert_eq!(m.public_url, "/guides/guide");
        assert!(m.edit_url.ends_with("/docs/guides/guide.md"));
        assert_eq!(m.file_path, "docs/guides/guide.md");
    }

    #[test]
    fn chunking_is_deterministic() {
        let raw = format!("## One\n\n{}\n\n## Two\n\nshort\n", "text ".repeat(300));
        let a = default_chunker().chunk(&doc("docs/d.md", &raw));
        let b = default_chunker().chunk(&doc("docs/d.md", &raw));
        assert_eq!(a, b);
    }

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Getting Started!"), "getting-started");
        assert_eq!(slugify("API & CLI"), "api-cli");
        assert_eq!(slugify("v2.0"), "v2-0");
    }

    #[test]
    fn sliding_windows_short_input_single_window() {
        let words = ["a", "b", "c"];
        let windows = sliding_windows(&words, 10, 2);
        assert_eq!(windows, vec!["a b c"]);
    }

    mod proptest_chunker {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn chunk_never_panics(
                content in "\\PC{0,3000}",
                threshold in 50usize..2000,
                window in 10usize..200,
                overlap in 0usize..50,
            ) {
                let chunker = Chunker::new(ChunkerConfig {
                    threshold_chars: threshold,
                    window_words: window,
                    overlap_words: overlap,
                    ..ChunkerConfig::default()
                });
                let _ = chunker.chunk(&SourceDocument::parse("docs/p.md", &content));
            }

            #[test]
            fn no_empty_chunks(content in "[a-z#\\n ]{0,2000}") {
                let chunks = Chunker::default().chunk(&SourceDocument::parse("docs/p.md", &content));
                for c in &chunks {
                    prop_assert!(!c.text.trim().is_empty());
                }
            }

            #[test]
            fn window_indices_sequential(word_count in 100usize..600) {
                let body: String = (0..word_count).map(|i| format!("w{i} ")).collect();
                let chunker = Chunker::new(ChunkerConfig {
                    threshold_chars: 80,
                    window_words: 30,
                    overlap_words: 5,
                    ..ChunkerConfig::default()
                });
                let chunks = chunker.chunk(&SourceDocument::parse("docs/p.md", &body));
                for (i, c) in chunks.iter().enumerate() {
                    prop_assert_eq!(c.metadata.window_index, Some(i));
                }
            }
        }
    }
}
