//! Layered accept/sanitize/reject decision for one document
//!
//! 1. pattern scan on the raw text: any match rejects, the reviewer is never asked
//! 2. semantic review, when a generator is configured
//! 3. otherwise a pattern-only `keep`

use senjutsu_provider::TextGenerator;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::review::SemanticReviewer;
use crate::scanner::PatternScanner;
use crate::verdict::ValidationVerdict;

pub struct SecurityValidator {
    scanner: PatternScanner,
    reviewer: Option<SemanticReviewer>,
}

impl SecurityValidator {
    /// Create a validator, with semantic review when a generator is supplied
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Result<Self> {
        let reviewer = generator.map(SemanticReviewer::new).transpose()?;
        Ok(Self {
            scanner: PatternScanner::new()?,
            reviewer,
        })
    }

    /// Scanner-only validator
    pub fn pattern_only() -> Result<Self> {
        Self::new(None)
    }

    pub fn scanner(&self) -> &PatternScanner {
        &self.scanner
    }

    pub fn has_reviewer(&self) -> bool {
        self.reviewer.is_some()
    }

    /// Validate `content` published under `name`.
    ///
    /// Only a failing generator call surfaces as an error.
    pub async fn validate(&self, name: &str, content: &str) -> Result<ValidationVerdict> {
        let scan = self.scanner.scan(content);
        if !scan.safe {
            debug!(skill = name, findings = scan.matches.len(), "Pattern scan vetoed");
            return Ok(ValidationVerdict::pattern_reject(scan.matches));
        }

        let Some(reviewer) = &self.reviewer else {
            return Ok(ValidationVerdict::pattern_only());
        };

        let mut verdict = reviewer.review(name, content).await?;
        if let Some(rewrite) = verdict.sanitized_version.take() {
            verdict.sanitized_version = self.enforce_clean(name, &rewrite);
        }
        Ok(verdict)
    }

    /// A reviewer rewrite is stored only once it is free of every signature.
    /// Falls back to `None` (store the already-scanned original) otherwise.
    fn enforce_clean(&self, name: &str, rewrite: &str) -> Option<String> {
        let cleaned = self.scanner.sanitize(rewrite);
        if self.scanner.is_safe(&cleaned) {
            Some(cleaned)
        } else {
            warn!(skill = name, "Reviewer rewrite still matches signatures, keeping original");
            None
        }
    }
}
