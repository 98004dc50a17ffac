//! Extract, render and post, one failure at a time.

use std::io::BufRead;

use tracing::{info, warn};

use crate::context::BuildContext;
use crate::error::{PostError, Result};
use crate::extractor::{FailureScanner, MarkerPolicy};
use crate::formatter::{format_issue, FormatterConfig};
use crate::sink::{CreatedIssue, IssueSink};

/// Configuration for a posting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostConfig {
    pub formatter: FormatterConfig,
    pub marker_policy: MarkerPolicy,
}

/// Outcome of a posting run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostReport {
    /// Issues created, in log order.
    pub created: Vec<CreatedIssue>,

    /// Failures skipped because no running test could be attributed.
    pub unattributed: usize,

    /// Lines read from the log.
    pub lines_read: usize,
}

impl PostReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

/// Scan `input` and file one issue per attributed failure.
///
/// Unattributed failures are skipped with a warning. Any other error,
/// including the first sink error, stops the run.
pub async fn post_failures<R: BufRead>(
    input: R,
    ctx: &BuildContext,
    config: &PostConfig,
    sink: &dyn IssueSink,
) -> Result<PostReport> {
    let target = &config.formatter.target;
    let mut report = PostReport::default();
    let mut scanner =
        FailureScanner::new(input, ctx.package.as_str()).with_policy(config.marker_policy);

    info!(
        package = %ctx.package,
        build_id = ctx.build_id,
        sha = %ctx.sha,
        target = %target,
        "Scanning stress log for failures"
    );

    for item in scanner.by_ref() {
        let record = match item {
            Ok(record) => record,
            Err(err) if err.is_recoverable() => {
                warn!(error = %err, "Skipping failure");
                report.unattributed += 1;
                continue;
            }
            Err(err) => return Err(err),
        };

        let request = format_issue(&record, ctx, &config.formatter)?;
        let issue = sink
            .create_issue(&target.owner, &target.repo, &request)
            .await
            .map_err(|source| PostError::IssueCreation {
                owner: target.owner.clone(),
                repo: target.repo.clone(),
                source,
            })?;

        info!(
            number = issue.number,
            test = %record.test,
            signature = %record.signature,
            "Created issue"
        );
        report.created.push(issue);
    }

    report.lines_read = scanner.lines_read();
    info!(
        created = report.created_count(),
        unattributed = report.unattributed,
        lines = report.lines_read,
        "Finished scanning stress log"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::RecordingIssueSink;
    use std::io::Cursor;

    const TIMEOUT_LINE: &str = "\t<autogenerated>:12: storage/replicate_queue_test.go:103, condition failed to evaluate within 45s: not balanced: [10 1 10 1 8]";

    fn ctx() -> BuildContext {
        BuildContext::new("abcd123", "https://teamcity.example.com", 8008135, "foo/bar/baz")
            .with_parameter("TAGS", "deadlock")
    }

    #[tokio::test]
    async fn test_posts_one_issue_per_failure() {
        let log = format!(
            "=== RUN   TestA\n{TIMEOUT_LINE}\n=== RUN   TestB\n{TIMEOUT_LINE}\n"
        );
        let sink = RecordingIssueSink::new().starting_at(100);
        let report = post_failures(Cursor::new(log), &ctx(), &PostConfig::default(), &sink)
            .await
            .unwrap();

        assert_eq!(report.created_count(), 2);
        assert_eq!(report.created[0].number, 100);
        assert_eq!(report.created[1].number, 101);
        assert_eq!(report.unattributed, 0);
        assert_eq!(report.lines_read, 4);

        let calls = sink.calls();
        assert_eq!(calls[0].request.title, "foo/bar/baz: TestA failed under stress");
        assert_eq!(calls[1].request.title, "foo/bar/baz: TestB failed under stress");
    }

    #[tokio::test]
    async fn test_unattributed_failures_are_counted_not_posted() {
        let log = format!("{TIMEOUT_LINE}\n=== RUN   TestA\n{TIMEOUT_LINE}\n");
        let sink = RecordingIssueSink::new();
        let report = post_failures(Cursor::new(log), &ctx(), &PostConfig::default(), &sink)
            .await
            .unwrap();

        assert_eq!(report.unattributed, 1);
        assert_eq!(report.created_count(), 1);
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test]
    async fn test_sink_error_aborts_remaining_failures() {
        let log = format!(
            "=== RUN   TestA\n{TIMEOUT_LINE}\n=== RUN   TestB\n{TIMEOUT_LINE}\n"
        );
        let sink = RecordingIssueSink::new().failing_from(1);
        let err = post_failures(Cursor::new(log), &ctx(), &PostConfig::default(), &sink)
            .await
            .unwrap_err();

        assert!(matches!(err, PostError::IssueCreation { .. }));
        assert!(err.to_string().contains("refusing call 1"));
        assert_eq!(sink.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_log_creates_nothing() {
        let sink = RecordingIssueSink::new();
        let report = post_failures(Cursor::new(""), &ctx(), &PostConfig::default(), &sink)
            .await
            .unwrap();
        assert_eq!(report, PostReport::default());
        assert_eq!(sink.call_count(), 0);
    }

    #[tokio::test]
    async fn test_marker_policy_is_honoured() {
        let log = format!("=== RUN   TestA\n{TIMEOUT_LINE}\n{TIMEOUT_LINE}\n");
        let config = PostConfig {
            marker_policy: MarkerPolicy::ConsumeOnce,
            ..PostConfig::default()
        };
        let sink = RecordingIssueSink::new();
        let report = post_failures(Cursor::new(log), &ctx(), &config, &sink)
            .await
            .unwrap();
        assert_eq!(report.created_count(), 1);
        assert_eq!(report.unattributed, 1);
    }
}
