//! Build metadata and issue targets supplied by the caller.

use serde::{Deserialize, Serialize};

/// Organization that owns the repository issues are filed against.
pub const DEFAULT_OWNER: &str = "cockroachdb";

/// Repository issues are filed against.
pub const DEFAULT_REPO: &str = "cockroach";

/// Metadata describing one CI run.
///
/// Constructed once by the caller (typically from TeamCity environment
/// variables) and only read by the extractor and formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildContext {
    /// Commit SHA the build ran against.
    pub sha: String,

    /// Base URL of the CI server, e.g. `https://teamcity.example.com`.
    pub server_url: String,

    /// Numeric build identifier on the CI server.
    pub build_id: u64,

    /// Package the stress run exercised; failures are attributed to it.
    pub package: String,

    /// Build parameters echoed into the issue, in declaration order.
    pub parameters: Vec<(String, String)>,
}

impl BuildContext {
    /// Create a context with no build parameters.
    pub fn new(
        sha: impl Into<String>,
        server_url: impl Into<String>,
        build_id: u64,
        package: impl Into<String>,
    ) -> Self {
        Self {
            sha: sha.into(),
            server_url: server_url.into(),
            build_id,
            package: package.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a build parameter. Order of calls is the order rendered.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((key.into(), value.into()));
        self
    }

    /// Link to this build's log on the CI server.
    pub fn build_log_url(&self) -> String {
        format!(
            "{}/viewLog.html?buildId={}&tab=buildLog",
            self.server_url.trim_end_matches('/'),
            self.build_id
        )
    }
}

/// Repository that receives the rendered issues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueTarget {
    pub owner: String,
    pub repo: String,
}

impl IssueTarget {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Link to a commit in the target repository.
    pub fn commit_url(&self, sha: &str) -> String {
        format!(
            "https://github.com/{}/{}/commits/{}",
            self.owner, self.repo, sha
        )
    }
}

impl Default for IssueTarget {
    fn default() -> Self {
        Self::new(DEFAULT_OWNER, DEFAULT_REPO)
    }
}

impl std::fmt::Display for IssueTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_keep_declaration_order() {
        let ctx = BuildContext::new("abcd123", "https://tc.example.com", 1, "foo/bar/baz")
            .with_parameter("TAGS", "deadlock")
            .with_parameter("COCKROACH_PROPOSER_EVALUATED_KV", "true")
            .with_parameter("GOFLAGS", "race");

        let keys: Vec<&str> = ctx.parameters.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["TAGS", "COCKROACH_PROPOSER_EVALUATED_KV", "GOFLAGS"]);
    }

    #[test]
    fn test_build_log_url() {
        let ctx = BuildContext::new("abcd123", "https://teamcity.example.com", 8008135, "pkg");
        assert_eq!(
            ctx.build_log_url(),
            "https://teamcity.example.com/viewLog.html?buildId=8008135&tab=buildLog"
        );
    }

    #[test]
    fn test_build_log_url_trims_trailing_slash() {
        let ctx = BuildContext::new("abcd123", "https://teamcity.example.com/", 42, "pkg");
        assert_eq!(
            ctx.build_log_url(),
            "https://teamcity.example.com/viewLog.html?buildId=42&tab=buildLog"
        );
    }

    #[test]
    fn test_default_target() {
        let target = IssueTarget::default();
        assert_eq!(target.owner, "cockroachdb");
        assert_eq!(target.repo, "cockroach");
        assert_eq!(target.to_string(), "cockroachdb/cockroach");
        assert_eq!(
            target.commit_url("abcd123"),
            "https://github.com/cockroachdb/cockroach/commits/abcd123"
        );
    }
}
