//! Error types for github-issues

use thiserror::Error;

/// Errors that can occur while talking to the GitHub API
#[derive(Error, Debug)]
pub enum GithubError {
    /// No API token configured
    #[error("GitHub API token is not configured (set GITHUB_API_TOKEN)")]
    MissingToken,

    /// Token cannot be used as a header value
    #[error("GitHub API token is not a valid header value")]
    InvalidToken,

    /// Request could not be sent or the response not read
    #[error("HTTP error: {0}")]
    Http(String),

    /// GitHub answered with a non-success status
    #[error("GitHub API {operation} failed with status {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for GithubError {
    fn from(err: reqwest::Error) -> Self {
        GithubError::Http(err.to_string())
    }
}
