//! GitHub REST client for filing issues
//!
//! Implements [`IssueSink`] on top of `POST /repos/{owner}/{repo}/issues`.
//! Requests are sent once; a failure is reported to the caller as is.

use async_trait::async_trait;
use github_post_core::{CreatedIssue, IssueRequest, IssueSink, SinkError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::GithubError;
use crate::Result;

/// Default public GitHub API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const ERROR_BODY_LIMIT: usize = 800;

/// GitHub client configuration
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// API base URL
    pub api_url: String,
    /// Personal access or app token
    pub token: Option<String>,
    /// User agent sent with every request
    pub user_agent: String,
}

impl GithubConfig {
    /// Create config for a specific API endpoint
    pub fn new(api_url: &str) -> Self {
        GithubConfig {
            api_url: api_url.to_string(),
            token: None,
            user_agent: concat!("github-post/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    html_url: Option<String>,
}

/// GitHub client for issue creation
pub struct GithubClient {
    api_url: String,
    http_client: reqwest::Client,
}

impl GithubClient {
    /// Create a new GitHub client; fails without a usable token
    pub fn new(config: GithubConfig) -> Result<Self> {
        let token = config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(GithubError::MissingToken)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GithubError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(GithubClient {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    /// Endpoint issues for `owner/repo` are posted to
    pub fn issues_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}/issues", self.api_url, owner, repo)
    }

    /// Create one issue
    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> Result<CreatedIssue> {
        let url = self.issues_url(owner, repo);
        debug!(url = %url, title = %request.title, "Posting issue");

        let response = self.http_client.post(&url).json(request).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(GithubError::Status {
                operation: "create issue".to_string(),
                status: status.as_u16(),
                body: truncate_for_error(&text),
            });
        }

        let issue = parse_created_issue(&text)?;
        info!(
            number = issue.number,
            url = issue.html_url.as_deref().unwrap_or(""),
            "GitHub accepted issue"
        );
        Ok(issue)
    }
}

#[async_trait]
impl IssueSink for GithubClient {
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        request: &IssueRequest,
    ) -> std::result::Result<CreatedIssue, SinkError> {
        GithubClient::create_issue(self, owner, repo, request)
            .await
            .map_err(Into::into)
    }
}

fn parse_created_issue(body: &str) -> Result<CreatedIssue> {
    let response: IssueResponse = serde_json::from_str(body)?;
    Ok(CreatedIssue {
        number: response.number,
        html_url: response.html_url,
    })
}

fn truncate_for_error(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}
