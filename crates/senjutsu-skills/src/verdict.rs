//! Validation verdict types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk reported for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
    /// The deep reviewer answered, but not in a parseable shape
    ParseError,
}

impl RiskLevel {
    /// Position on the none..critical scale; `None` for the degraded marker
    #[must_use]
    pub fn severity(self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Low => Some(1),
            Self::Medium => Some(2),
            Self::High => Some(3),
            Self::Critical => Some(4),
            Self::ParseError => None,
        }
    }

    #[must_use]
    pub fn is_degraded(self) -> bool {
        matches!(self, Self::ParseError)
    }

    /// Case-insensitive reviewer label on the none..critical scale
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
            Self::Critical => f.write_str("critical"),
            Self::ParseError => f.write_str("parse_error"),
        }
    }
}

/// What the store should do with a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Keep,
    Sanitize,
    Reject,
}

impl Recommendation {
    /// Case-insensitive `keep` / `sanitize` / `reject`
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "keep" => Some(Self::Keep),
            "sanitize" => Some(Self::Sanitize),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep => f.write_str("keep"),
            Self::Sanitize => f.write_str("sanitize"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Stage that produced the final verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationLayer {
    /// Pattern scanner matched and vetoed
    PatternScan,
    /// Semantic reviewer decided
    LlmReview,
    /// Scanner passed and no reviewer is configured
    PatternOnly,
}

impl fmt::Display for ValidationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PatternScan => f.write_str("pattern-scan"),
            Self::LlmReview => f.write_str("llm-review"),
            Self::PatternOnly => f.write_str("pattern-only"),
        }
    }
}

/// Result of checking one document's raw text
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationVerdict {
    pub safe: bool,
    pub risk_level: RiskLevel,
    pub issues: Vec<String>,
    /// Replacement text, only ever set alongside [`Recommendation::Sanitize`]
    pub sanitized_version: Option<String>,
    pub recommendation: Recommendation,
    pub layer: ValidationLayer,
    /// Unparseable reviewer output, kept for diagnostics
    pub raw_review: Option<String>,
}

impl ValidationVerdict {
    /// Hard veto from the pattern scanner
    pub fn pattern_reject(issues: Vec<String>) -> Self {
        Self {
            safe: false,
            risk_level: RiskLevel::High,
            issues,
            sanitized_version: None,
            recommendation: Recommendation::Reject,
            layer: ValidationLayer::PatternScan,
            raw_review: None,
        }
    }

    /// Scanner passed, nothing else to ask
    pub fn pattern_only() -> Self {
        Self {
            safe: true,
            risk_level: RiskLevel::None,
            issues: Vec::new(),
            sanitized_version: None,
            recommendation: Recommendation::Keep,
            layer: ValidationLayer::PatternOnly,
            raw_review: None,
        }
    }

    /// Fail-open verdict for reviewer output that could not be parsed
    pub fn parse_error(raw: impl Into<String>) -> Self {
        Self {
            safe: true,
            risk_level: RiskLevel::ParseError,
            issues: Vec::new(),
            sanitized_version: None,
            recommendation: Recommendation::Keep,
            layer: ValidationLayer::LlmReview,
            raw_review: Some(raw.into()),
        }
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.recommendation == Recommendation::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_reject_shape() {
        let verdict = ValidationVerdict::pattern_reject(vec!["Pattern 3".into()]);
        assert!(verdict.is_rejected());
        assert!(!verdict.safe);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert_eq!(verdict.layer.to_string(), "pattern-scan");
        assert!(verdict.sanitized_version.is_none());
    }

    #[test]
    fn test_parse_error_fails_open() {
        let verdict = ValidationVerdict::parse_error("not json");
        assert_eq!(verdict.recommendation, Recommendation::Keep);
        assert!(verdict.risk_level.is_degraded());
        assert_eq!(verdict.risk_level.severity(), None);
        assert!(verdict.issues.is_empty());
        assert_eq!(verdict.raw_review.as_deref(), Some("not json"));
    }

    #[test]
    fn test_labels_ignore_case_and_padding() {
        assert_eq!(RiskLevel::from_label(" High "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::from_label("severe"), None);
        assert_eq!(RiskLevel::from_label("parse_error"), None);
        assert_eq!(Recommendation::from_label("REJECT"), Some(Recommendation::Reject));
        assert_eq!(Recommendation::from_label("drop"), None);
    }

    #[test]
    fn test_severity_is_ordered() {
        let levels = [
            RiskLevel::None,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ];
        let severities: Vec<_> = levels.iter().filter_map(|l| l.severity()).collect();
        assert_eq!(severities, vec![0, 1, 2, 3, 4]);
    }
}
