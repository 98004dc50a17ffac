//! github-post core: turn stress-test logs into GitHub issues
//!
//! Provides the pieces a CI step needs after a failed stress run:
//! - [`FailureScanner`]: single-pass extraction of failed tests from `go test -v` output
//! - [`format_issue`]: rendering of a failure plus build metadata into an issue
//! - [`post_failures`]: the scan → render → [`IssueSink`] pipeline
//!
//! Configuration, log file access and the GitHub client live in the calling
//! crates; everything here works on explicit values.

pub mod context;
pub mod error;
pub mod extractor;
pub mod fakes;
pub mod formatter;
pub mod pipeline;
pub mod signature;
pub mod sink;
mod telemetry;

// Re-export key types
pub use context::{BuildContext, IssueTarget, DEFAULT_OWNER, DEFAULT_REPO};
pub use error::{PostError, Result, SinkError};
pub use extractor::{FailureRecord, FailureScanner, MarkerPolicy};
pub use formatter::{format_issue, FormatterConfig, IssueRequest, GITHUB_ISSUE_BODY_MAX_LEN};
pub use pipeline::{post_failures, PostConfig, PostReport};
pub use signature::Signature;
pub use sink::{CreatedIssue, IssueSink};
pub use telemetry::init_tracing;
