//! Error types for failure extraction, rendering and posting

use thiserror::Error;

use crate::signature::Signature;

/// Error returned by an [`IssueSink`](crate::sink::IssueSink) implementation.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PostError {
    /// The log stream could not be read.
    #[error("failed to read log stream: {0}")]
    Io(#[from] std::io::Error),

    /// A failure line appeared while no test was known to be running.
    #[error("{signature} failure on line {line} has no running test to attribute it to")]
    UnattributedFailure { signature: Signature, line: usize },

    #[error("invalid failure record: {0}")]
    InvalidRecord(String),

    #[error("issue header is {len} bytes, exceeding the {max}-byte body limit")]
    OversizedHeader { len: usize, max: usize },

    #[error("failed to create issue in {owner}/{repo}: {source}")]
    IssueCreation {
        owner: String,
        repo: String,
        #[source]
        source: SinkError,
    },
}

impl PostError {
    /// Whether the pipeline may skip this error and keep scanning.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PostError::UnattributedFailure { .. })
    }
}

/// Result type for github-post operations
pub type Result<T> = std::result::Result<T, PostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unattributed_is_recoverable() {
        let unattributed = PostError::UnattributedFailure {
            signature: Signature::Fatal,
            line: 3,
        };
        assert!(unattributed.is_recoverable());

        let invalid = PostError::InvalidRecord("empty test name".to_string());
        assert!(!invalid.is_recoverable());

        let io = PostError::from(std::io::Error::other("boom"));
        assert!(!io.is_recoverable());
    }

    #[test]
    fn test_issue_creation_keeps_source() {
        let err = PostError::IssueCreation {
            owner: "cockroachdb".to_string(),
            repo: "cockroach".to_string(),
            source: "rate limited".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to create issue in cockroachdb/cockroach: rate limited"
        );
        assert_eq!(
            std::error::Error::source(&err).map(|s| s.to_string()),
            Some("rate limited".to_string())
        );
    }
}
