//! Skill documents and the metadata derived from raw files

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Maximum description length kept on a document
pub const MAX_DESCRIPTION_CHARS: usize = 120;
/// A fallback description line must be longer than this
const MIN_DESCRIPTION_LINE_CHARS: usize = 15;
/// Hex characters of the SHA-256 digest kept as content hash
const HASH_HEX_CHARS: usize = 16;

pub const SKILL_MD: &str = "SKILL.md";
pub const CURSORRULES_SUFFIX: &str = ".cursorrules";
pub const LLMS_TXT: &str = "llms.txt";
pub const LLMS_FULL_TXT: &str = "llms-full.txt";

/// How a skill file is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkillFormat {
    /// `SKILL.md` with `---` front matter
    SkillMd,
    /// `*.cursorrules` rule file
    CursorRules,
    /// `llms.txt` / `llms-full.txt` plain instructions
    LlmsTxt,
}

impl SkillFormat {
    /// Recognise a skill file by its file name
    pub fn detect(file_name: &str) -> Option<Self> {
        if file_name == SKILL_MD {
            Some(Self::SkillMd)
        } else if file_name.ends_with(CURSORRULES_SUFFIX) {
            Some(Self::CursorRules)
        } else if file_name == LLMS_TXT || file_name == LLMS_FULL_TXT {
            Some(Self::LlmsTxt)
        } else {
            None
        }
    }
}

impl fmt::Display for SkillFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SkillMd => f.write_str("skill_md"),
            Self::CursorRules => f.write_str("cursorrules"),
            Self::LlmsTxt => f.write_str("llms_txt"),
        }
    }
}

/// A validated, retrievable unit of guidance.
///
/// Only the store builds these, after the security validator accepted the
/// raw text.
#[derive(Debug, Clone, PartialEq)]
pub struct SkillDocument {
    name: String,
    source: String,
    format: SkillFormat,
    description: String,
    content: String,
    content_hash: String,
    path: PathBuf,
}

impl SkillDocument {
    pub(crate) fn new(
        name: String,
        source: String,
        format: SkillFormat,
        description: String,
        content: String,
        content_hash: String,
        path: PathBuf,
    ) -> Self {
        Self {
            name,
            source,
            format,
            description,
            content,
            content_hash,
            path,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provenance tag, never used for trust
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn format(&self) -> SkillFormat {
        self.format
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Stored body: original text or the sanitized rewrite
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Short hash of the original raw text
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store key, `source::name`
    pub fn key(&self) -> String {
        store_key(&self.source, &self.name)
    }
}

pub fn store_key(source: &str, name: &str) -> String {
    format!("{source}::{name}")
}

#[derive(Debug, Default, Deserialize)]
struct FrontmatterFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Metadata found in a leading `---` block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frontmatter {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Frontmatter {
    /// Split `raw` into front matter and body.
    ///
    /// Returns `None` when `raw` does not open with `---`. An unclosed block
    /// runs to the end of the text and leaves an empty body.
    pub fn split(raw: &str) -> Option<(Self, &str)> {
        if !raw.starts_with("---") {
            return None;
        }

        let after_open = raw.find('\n').map_or("", |i| &raw[i + 1..]);
        let (block, body) = match find_closing_delimiter(after_open) {
            Some((start, end)) => (&after_open[..start], &after_open[end..]),
            None => (after_open, ""),
        };

        Some((Self::parse_block(block), body))
    }

    fn parse_block(block: &str) -> Self {
        let fields = serde_yaml::from_str::<FrontmatterFields>(block)
            .unwrap_or_else(|_| scan_fields(block));

        Self {
            name: fields.name.and_then(non_empty),
            description: fields.description.and_then(non_empty),
        }
    }
}

/// Byte range of the first line that is exactly `---`
fn find_closing_delimiter(text: &str) -> Option<(usize, usize)> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((offset, offset + line.len()));
        }
        offset += line.len();
    }
    None
}

/// Line-oriented fallback for blocks that are not valid YAML
fn scan_fields(block: &str) -> FrontmatterFields {
    let mut fields = FrontmatterFields::default();
    for line in block.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("name:") {
            fields.name.get_or_insert_with(|| unquote(value));
        } else if let Some(value) = line.strip_prefix("description:") {
            fields.description.get_or_insert_with(|| unquote(value));
        }
    }
    fields
}

fn unquote(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

fn non_empty(value: String) -> Option<String> {
    let value = value.trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Name from the file location: parent directory for `SKILL.md`/`llms*.txt`,
/// file stem for rule files. Underscores become hyphens.
pub fn name_from_path(path: &Path, format: SkillFormat) -> String {
    let parent_name = || {
        path.parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };

    let raw = match format {
        SkillFormat::SkillMd | SkillFormat::LlmsTxt => parent_name(),
        SkillFormat::CursorRules => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match file_name.strip_suffix(CURSORRULES_SUFFIX) {
                Some(stem) if !stem.is_empty() => stem.to_string(),
                _ => parent_name(),
            }
        }
    };

    raw.replace('_', "-")
}

/// Short summary: front matter description for `SKILL.md`, else the first
/// substantial non-heading body line, else `fallback`.
pub fn extract_description(
    body: &str,
    frontmatter: Option<&Frontmatter>,
    format: SkillFormat,
    fallback: &str,
) -> String {
    if format == SkillFormat::SkillMd {
        if let Some(description) = frontmatter.and_then(|fm| fm.description.as_deref()) {
            return truncate_chars(description, MAX_DESCRIPTION_CHARS).to_string();
        }
    }

    body.lines()
        .map(str::trim)
        .find(|line| {
            !line.is_empty()
                && !line.starts_with('#')
                && line.chars().count() > MIN_DESCRIPTION_LINE_CHARS
        })
        .map_or_else(
            || fallback.to_string(),
            |line| truncate_chars(line, MAX_DESCRIPTION_CHARS).to_string(),
        )
}

/// First 16 hex characters of the SHA-256 of `raw`
pub fn content_hash(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let mut hex = format!("{digest:x}");
    hex.truncate(HASH_HEX_CHARS);
    hex
}

/// Prefix of `text` holding at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
