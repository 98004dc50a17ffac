//! Sink that prints rendered issues instead of filing them.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use github_post_core::{CreatedIssue, IssueRequest, IssueSink, SinkError};
use serde::Serialize;

#[derive(Serialize)]
struct PrintedIssue<'a> {
    owner: &'a str,
    repo: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Writes one JSON line per issue to stdout and numbers them from 1.
#[derive(Debug, Default)]
pub struct DryRunSink {
    printed: AtomicU64,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IssueSink for DryRunSink {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> std::result::Result<CreatedIssue, SinkError> {
        let line = serde_json::to_string(&PrintedIssue {
            owner,
            repo,
            title: &request.title,
            body: &request.body,
        })?;
        writeln!(std::io::stdout().lock(), "{line}")?;

        let number = self.printed.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(CreatedIssue {
            number,
            html_url: None,
        })
    }
}
