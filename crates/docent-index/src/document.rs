//! Source document loading: front-matter extraction, MDX normalization,
//! and URL derivation. Everything here is deterministic and offline so
//! chunking stays reproducible for identical file content.

use std::sync::LazyLock;

use regex::Regex;

/// Front-matter fields recognized at the top of a Markdown file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
}

/// One Markdown/MDX file, normalized and ready for chunking.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Path relative to the corpus root, forward slashes.
    pub rel_path: String,
    pub file_name: String,
    /// blake3 hex of the raw file bytes.
    pub fingerprint: String,
    pub front_matter: FrontMatter,
    /// Body with front matter stripped and component markup reduced to
    /// plain text. May be empty, in which case chunking yields nothing.
    pub content: String,
}

impl SourceDocument {
    /// Parse raw file text into a normalized document.
    #[must_use]
    pub fn parse(rel_path: &str, raw: &str) -> Self {
        let fingerprint = blake3::hash(raw.as_bytes()).to_hex().to_string();
        let (front_matter, body) = split_front_matter(raw);
        let content = normalize(body);
        let file_name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_owned();

        Self {
            rel_path: rel_path.to_owned(),
            file_name,
            fingerprint,
            front_matter,
            content,
        }
    }

    /// Document title: front matter, else first `# ` heading, else the file stem.
    #[must_use]
    pub fn title(&self) -> String {
        if let Some(title) = &self.front_matter.title {
            return title.clone();
        }
        for line in self.content.lines() {
            if let Some(rest) = line.strip_prefix("# ") {
                return rest.trim().to_owned();
            }
        }
        self.file_name
            .rsplit_once('.')
            .map_or(self.file_name.as_str(), |(stem, _)| stem)
            .to_owned()
    }
}

/// Split a leading `---` front-matter block from the body.
fn split_front_matter(raw: &str) -> (FrontMatter, &str) {
    let Some(rest) = raw.strip_prefix("---\n").or_else(|| raw.strip_prefix("---\r\n")) else {
        return (FrontMatter::default(), raw);
    };
    let Some(end) = rest.find("\n---") else {
        return (FrontMatter::default(), raw);
    };
    let block = &rest[..end];
    let body = rest[end + 4..].trim_start_matches(['\r', '\n']);
    (parse_front_matter(block), body)
}

/// Minimal `key: value` front-matter parsing; only the keys the chunk
/// metadata carries are recognized.
fn parse_front_matter(block: &str) -> FrontMatter {
    let mut fm = FrontMatter::default();
    for line in block.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(['"', '\'']);
        match key.trim() {
            "title" => fm.title = Some(value.to_owned()),
            "category" => fm.category = Some(value.to_owned()),
            "tags" => {
                fm.tags = value
                    .trim_matches(['[', ']'])
                    .split(',')
                    .map(|t| t.trim().trim_matches(['"', '\'']).to_owned())
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            _ => {}
        }
    }
    fm
}

static MDX_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(import|export)\s.*$").unwrap());
static COMPONENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Z][A-Za-z0-9]*(\s[^>]*)?/?>").unwrap());
static ADMONITION_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^:::\s*([a-zA-Z]+).*$").unwrap());
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Reduce MDX/component markup to a plain-text equivalent.
///
/// Admonitions become a labeled paragraph (`:::note` → `Note:`),
/// component tags and MDX import/export lines are dropped, runs of
/// blank lines collapse.
fn normalize(body: &str) -> String {
    let text = MDX_IMPORT.replace_all(body, "");
    let text = ADMONITION_OPEN.replace_all(&text, |caps: &regex::Captures<'_>| {
        let label = &caps[1];
        let mut chars = label.chars();
        match chars.next() {
            Some(first) => format!("{}{}:", first.to_uppercase(), chars.as_str().to_lowercase()),
            None => String::new(),
        }
    });
    let text = text.replace(":::", "");
    let text = COMPONENT_TAG.replace_all(&text, "");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_owned()
}

/// Source-root prefixes stripped when deriving public URLs.
pub const SOURCE_ROOTS: &[&str] = &["src/content/docs/", "content/docs/", "docs/"];

/// Public site URL for a source file: strip the source root and the
/// file extension, collapse a trailing `/index`.
#[must_use]
pub fn public_url(rel_path: &str) -> String {
    let mut path = rel_path;
    for root in SOURCE_ROOTS {
        if let Some(stripped) = path.strip_prefix(root) {
            path = stripped;
            break;
        }
    }
    let path = path
        .strip_suffix(".mdx")
        .or_else(|| path.strip_suffix(".md"))
        .unwrap_or(path);
    let path = path.strip_suffix("/index").unwrap_or(path);
    let path = if path == "index" { "" } else { path };
    format!("/{path}")
}

/// Repository edit URL: the source root is replaced by a fixed
/// repository path template.
#[must_use]
pub fn edit_url(rel_path: &str, edit_base: &str) -> String {
    format!("{}/{}", edit_base.trim_end_matches('/'), rel_path)
}
