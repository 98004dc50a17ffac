//! Rendering of failure records into GitHub issue requests.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::{BuildContext, IssueTarget};
use crate::error::{PostError, Result};
use crate::extractor::FailureRecord;

/// Maximum issue body length GitHub accepts, in bytes.
pub const GITHUB_ISSUE_BODY_MAX_LEN: usize = (1 << 16) - 1;

const FENCE_OPEN: &str = "\n\n```\n";
const FENCE_CLOSE: &str = "\n```";

/// A rendered issue, ready to hand to an [`IssueSink`](crate::sink::IssueSink).
///
/// Serializes to the GitHub create-issue payload; the target travels
/// separately as the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    #[serde(skip)]
    pub target: IssueTarget,
}

/// Configuration for the issue formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatterConfig {
    /// Repository the issues are filed against.
    pub target: IssueTarget,

    /// Upper bound on the rendered body, in bytes.
    pub max_body_len: usize,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            target: IssueTarget::default(),
            max_body_len: GITHUB_ISSUE_BODY_MAX_LEN,
        }
    }
}

/// Issue title for a failed test.
pub fn render_title(record: &FailureRecord) -> Result<String> {
    if record.package.trim().is_empty() {
        return Err(PostError::InvalidRecord(format!(
            "empty package name for test '{}'",
            record.test
        )));
    }
    if record.test.trim().is_empty() {
        return Err(PostError::InvalidRecord(format!(
            "empty test name in package '{}'",
            record.package
        )));
    }
    Ok(format!("{}: {} failed under stress", record.package, record.test))
}

/// The `Parameters:` fenced block, one `key=value` per line in declaration order.
pub fn render_parameters(ctx: &BuildContext) -> String {
    let mut block = String::from("```\n");
    for (key, value) in &ctx.parameters {
        block.push_str(key);
        block.push('=');
        block.push_str(value);
        block.push('\n');
    }
    block.push_str("```");
    block
}

/// Everything in the body that precedes the excerpt. Never truncated.
pub fn render_header(ctx: &BuildContext, target: &IssueTarget) -> String {
    format!(
        "SHA: {}\n\nParameters:\n\n{}\n\nStress build found a failed test: {}",
        target.commit_url(&ctx.sha),
        render_parameters(ctx),
        ctx.build_log_url()
    )
}

/// Render one failure into an issue request.
///
/// When the body would exceed `config.max_body_len`, the excerpt is cut from
/// the end; the header and the fences around the excerpt stay intact.
/// The cut never splits a UTF-8 character, so a truncated body can be up to
/// 3 bytes shorter than the limit.
pub fn format_issue(
    record: &FailureRecord,
    ctx: &BuildContext,
    config: &FormatterConfig,
) -> Result<IssueRequest> {
    let title = render_title(record)?;
    let header = render_header(ctx, &config.target);

    let overhead = header.len() + FENCE_OPEN.len() + FENCE_CLOSE.len();
    if overhead > config.max_body_len {
        return Err(PostError::OversizedHeader {
            len: overhead,
            max: config.max_body_len,
        });
    }

    let excerpt = truncate_at_char_boundary(&record.excerpt, config.max_body_len - overhead);
    if excerpt.len() < record.excerpt.len() {
        warn!(
            test = %record.test,
            original = record.excerpt.len(),
            kept = excerpt.len(),
            "Truncated failure excerpt to fit issue body limit"
        );
    }

    let mut body = String::with_capacity(overhead + excerpt.len());
    body.push_str(&header);
    body.push_str(FENCE_OPEN);
    body.push_str(excerpt);
    body.push_str(FENCE_CLOSE);

    Ok(IssueRequest {
        title,
        body,
        target: config.target.clone(),
    })
}

/// Longest prefix of `s` that is at most `max` bytes and ends on a char boundary.
fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
