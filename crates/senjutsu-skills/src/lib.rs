//! Senjutsu Skills Pipeline
//!
//! Indexes skill documents from several sources, screens every one of them
//! before it can reach a prompt, and ranks them against free-text queries.
//!
//! ## Features
//!
//! - `SKILL.md`, `*.cursorrules` and `llms.txt` discovery across mirrored remotes,
//!   shipped skills and a user directory
//! - YAML frontmatter support for skill metadata (name, description)
//! - Two-layer security: regex signature veto, then optional semantic review
//! - Keyword retrieval with pinned-skill boosting, no network at query time
//!
//! ## Pipeline
//!
//! Pull (optional): clone or refresh remote mirrors with git
//! Index: discover files, validate, store under `source::name`
//! Retrieve: score stored documents against a query, best first

#![deny(unsafe_code)]

pub mod builtin;
pub mod document;
pub mod error;
pub mod retrieval;
pub mod review;
pub mod scanner;
pub mod sources;
pub mod store;
pub mod validator;
pub mod verdict;

pub use document::{SkillDocument, SkillFormat};
pub use error::{Result, SkillError};
pub use retrieval::{RetrievalConfig, RetrievalHit, Retriever};
pub use review::SemanticReviewer;
pub use scanner::{is_skill_safe, sanitize_skill, PatternScanner, ScanResult, ThreatCategory};
pub use sources::{RemoteSource, SourceRegistry};
pub use store::{IndexReport, SkillStore, StoreConfig};
pub use validator::SecurityValidator;
pub use verdict::{Recommendation, RiskLevel, ValidationLayer, ValidationVerdict};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Retriever, SecurityValidator, SkillDocument, SkillStore, SourceRegistry, StoreConfig,
    };
}
