//! github-issues: GitHub API integration for github-post
//!
//! Provides [`GithubClient`], the production [`IssueSink`](github_post_core::IssueSink)
//! that files rendered stress-failure issues through the GitHub REST API.
//! The caller supplies the endpoint and token through [`GithubConfig`].

mod client;
mod error;

pub use client::{GithubClient, GithubConfig, DEFAULT_API_URL};
pub use error::GithubError;

/// Result type for github-issues operations
pub type Result<T> = std::result::Result<T, GithubError>;
