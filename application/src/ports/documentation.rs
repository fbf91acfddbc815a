//! Documentation fetcher port
//!
//! Supplies README text used to ground AI conflict analysis.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocFetchError {
    #[error("Not a repository URL: {0}")]
    InvalidUrl(String),

    #[error("No README found for {0}")]
    NotFound(String),

    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout")]
    Timeout,
}

#[async_trait]
pub trait DocumentationFetcher: Send + Sync {
    /// Fetch the README for a repository URL
    async fn fetch_readme(&self, repository_url: &str) -> Result<String, DocFetchError>;
}
