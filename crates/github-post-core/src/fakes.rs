//! In-memory fakes for the issue sink (testing only)
//!
//! `RecordingIssueSink` stores every call instead of performing network I/O
//! and can be told to fail from a given call onwards.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::formatter::IssueRequest;
use crate::sink::{CreatedIssue, IssueSink};

/// One recorded `create_issue` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedIssue {
    pub owner: String,
    pub repo: String,
    pub request: IssueRequest,
}

/// Sink that records calls and hands out sequential issue numbers.
#[derive(Debug)]
pub struct RecordingIssueSink {
    calls: Mutex<Vec<RecordedIssue>>,
    first_number: u64,
    fail_from_call: Option<usize>,
}

impl Default for RecordingIssueSink {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            first_number: 1,
            fail_from_call: None,
        }
    }
}

impl RecordingIssueSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number handed to the first created issue.
    pub fn starting_at(mut self, number: u64) -> Self {
        self.first_number = number;
        self
    }

    /// Fail every call whose 1-based index is `call` or later.
    pub fn failing_from(mut self, call: usize) -> Self {
        self.fail_from_call = Some(call);
        self
    }

    /// All calls seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedIssue> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl IssueSink for RecordingIssueSink {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> std::result::Result<CreatedIssue, SinkError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(RecordedIssue {
            owner: owner.to_string(),
            repo: repo.to_string(),
            request: request.clone(),
        });
        let index = calls.len();

        if self.fail_from_call.is_some_and(|from| index >= from) {
            return Err(format!("refusing call {index}").into());
        }

        let number = self.first_number + (index as u64 - 1);
        Ok(CreatedIssue {
            number,
            html_url: Some(format!(
                "https://github.com/{owner}/{repo}/issues/{number}"
            )),
        })
    }
}
