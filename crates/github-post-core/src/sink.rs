//! Issue creation seam.
//!
//! The pipeline never talks to GitHub directly; it hands every rendered
//! request to an [`IssueSink`]. The production sink lives in the
//! `github-issues` crate, tests use [`crate::fakes::RecordingIssueSink`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SinkError;
use crate::formatter::IssueRequest;

/// An issue the tracker accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedIssue {
    /// Issue number within the repository.
    pub number: u64,

    /// Browser link, when the tracker reports one.
    pub html_url: Option<String>,
}

/// Something that can file an issue.
///
/// Called once per rendered request. An error aborts the run; implementations
/// must not retry on the pipeline's behalf.
#[async_trait]
pub trait IssueSink: Send + Sync {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> std::result::Result<CreatedIssue, SinkError>;
}
