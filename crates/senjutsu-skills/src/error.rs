//! Error types for skill indexing and screening

use thiserror::Error;

/// Skills errors
#[derive(Debug, Error)]
pub enum SkillError {
    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A scanner signature failed to compile
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// git exited unsuccessfully while mirroring a source
    #[error("source '{name}' sync failed: {reason}")]
    SyncFailed {
        /// Source name
        name: String,
        /// Failure reason (git stderr)
        reason: String,
    },

    /// git did not finish in time
    #[error("source '{name}' timed out after {timeout}s")]
    SyncTimeout {
        /// Source name
        name: String,
        /// Timeout in seconds
        timeout: u64,
    },

    /// The generation capability failed during semantic review
    #[error("semantic review of '{name}' failed: {reason}")]
    Review {
        /// Document name
        name: String,
        /// Failure reason
        reason: String,
    },

    /// Configuration value cannot be used
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No such skill
    #[error("skill not found: {0}")]
    NotFound(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, SkillError>;
