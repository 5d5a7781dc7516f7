//! Keyword retrieval over the skill store
//!
//! Every score is a plain sum: a pinned bonus, then per query token a name
//! hit, a description hit and each occurrence in the head of the body.
//! Matching is substring based, so `react` also counts inside `reactive`.

use std::collections::HashSet;

use crate::document::{truncate_chars, SkillDocument};
use crate::store::SkillStore;

pub const PINNED_BONUS: u32 = 500;
pub const NAME_WEIGHT: u32 = 15;
pub const DESCRIPTION_WEIGHT: u32 = 10;
pub const BODY_OCCURRENCE_WEIGHT: u32 = 2;
/// Characters of content scanned for body occurrences
pub const BODY_WINDOW_CHARS: usize = 600;
const MIN_TOKEN_CHARS: usize = 3;

/// Curated skills surfaced whenever any query token hits them
pub const DEFAULT_PINNED: &[&str] = &["dev-expert", "github-actions", "svg-animations"];

/// English and French function words plus generic task verbs
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "to", "of", "and", "or", "for", "in", "on", "with", "that", "this",
    "be", "as", "at", "from", "je", "le", "la", "les", "un", "une", "des", "et", "ou", "de", "du",
    "pour", "sur", "si", "qui", "que", "ce", "se", "il", "ils", "elle", "use", "when", "skill",
    "file", "task", "create", "make", "build", "run", "add",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    pub pinned: Vec<String>,
    pub stopwords: HashSet<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            pinned: DEFAULT_PINNED.iter().map(|s| (*s).to_string()).collect(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl RetrievalConfig {
    /// Names are matched against the lowercased document name
    pub fn with_pinned(mut self, pinned: Vec<String>) -> Self {
        self.pinned = pinned.into_iter().map(|p| p.to_lowercase()).collect();
        self
    }

    pub fn with_extra_stopwords<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stopwords
            .extend(extra.into_iter().map(|s| s.as_ref().to_lowercase()));
        self
    }
}

/// One ranked document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalHit<'a> {
    pub key: &'a str,
    pub document: &'a SkillDocument,
    pub score: u32,
}

pub struct Retriever {
    config: RetrievalConfig,
}

impl Default for Retriever {
    fn default() -> Self {
        Self::new(RetrievalConfig::default())
    }
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Lowercase runs of ASCII letters and hyphens, at least three long,
    /// minus stopwords. Repeated tokens are kept and score again.
    pub fn tokenize(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        lowered
            .split(|c: char| !(c.is_ascii_lowercase() || c == '-'))
            .filter(|t| t.len() >= MIN_TOKEN_CHARS)
            .filter(|t| !self.config.stopwords.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// Score one document against already tokenized query words
    pub fn score(&self, document: &SkillDocument, tokens: &[String]) -> u32 {
        let name = document.name().to_lowercase();
        let description = document.description().to_lowercase();
        let body = truncate_chars(document.content(), BODY_WINDOW_CHARS).to_lowercase();

        let mut score = 0;
        if self.config.pinned.iter().any(|p| name.contains(p.as_str())) {
            score += PINNED_BONUS;
        }

        for token in tokens {
            let token = token.as_str();
            if name.contains(token) {
                score += NAME_WEIGHT;
            }
            if description.contains(token) {
                score += DESCRIPTION_WEIGHT;
            }
            let occurrences = u32::try_from(body.matches(token).count()).unwrap_or(u32::MAX);
            score = score.saturating_add(occurrences.saturating_mul(BODY_OCCURRENCE_WEIGHT));
        }
        score
    }

    /// Top `top_k` documents with a positive score, best first.
    ///
    /// Equal scores keep store insertion order.
    pub fn retrieve<'a>(
        &self,
        store: &'a SkillStore,
        query: &str,
        top_k: usize,
    ) -> Vec<RetrievalHit<'a>> {
        let tokens = self.tokenize(query);

        let mut hits: Vec<RetrievalHit<'a>> = store
            .documents()
            .map(|(key, document)| RetrievalHit {
                key,
                document,
                score: self.score(document, &tokens),
            })
            .filter(|hit| hit.score > 0)
            .collect();

        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(top_k);
        hits
    }
}
