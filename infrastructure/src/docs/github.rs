//! README fetcher backed by the GitHub REST API.
//!
//! Requests the raw media type so the body is the README text itself rather
//! than base64 JSON. A token is optional; without one GitHub allows 60
//! requests per hour.

use crate::config::FileGitHubConfig;
use async_trait::async_trait;
use pitfall_application::{DocFetchError, DocumentationFetcher};
use pitfall_domain::parse_github_repository;
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;

pub struct GitHubReadmeFetcher {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubReadmeFetcher {
    pub fn new(
        api_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, DocFetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pitfall-detector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DocFetchError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Build a fetcher from `[github]`, reading the token variable if set.
    ///
    /// Returns `None` when documentation fetching is disabled.
    pub fn try_from_config(config: &FileGitHubConfig) -> Option<Self> {
        if !config.enabled {
            debug!("README fetching disabled in config");
            return None;
        }
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty());
        debug!(authenticated = token.is_some(), "GitHub README fetcher initialized");
        Self::new(
            config.api_url.clone(),
            token,
            Duration::from_secs(config.timeout_seconds),
        )
        .ok()
    }

    fn readme_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}/readme", self.api_url, owner, repo)
    }
}

#[async_trait]
impl DocumentationFetcher for GitHubReadmeFetcher {
    async fn fetch_readme(&self, repository_url: &str) -> Result<String, DocFetchError> {
        let (owner, repo) = parse_github_repository(repository_url)
            .ok_or_else(|| DocFetchError::InvalidUrl(repository_url.to_string()))?;
        let slug = format!("{}/{}", owner, repo);

        let mut request = self
            .client
            .get(self.readme_url(&owner, &repo))
            .header("Accept", "application/vnd.github.raw")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DocFetchError::Timeout
            } else {
                DocFetchError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
            || status == StatusCode::FORBIDDEN
                && response
                    .headers()
                    .get("x-ratelimit-remaining")
                    .is_some_and(|v| v.as_bytes() == b"0");
        if rate_limited {
            return Err(DocFetchError::RateLimited("api.github.com".to_string()));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(DocFetchError::NotFound(slug));
        }
        if !status.is_success() {
            return Err(DocFetchError::Http(format!("{} for {}", status, slug)));
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DocFetchError::Timeout
            } else {
                DocFetchError::Http(e.to_string())
            }
        })?;
        debug!(repository = %slug, chars = text.len(), "Fetched README");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readme_url() {
        let fetcher =
            GitHubReadmeFetcher::new("https://api.github.com/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.readme_url("gradio-app", "gradio"),
            "https://api.github.com/repos/gradio-app/gradio/readme"
        );
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_request() {
        let fetcher =
            GitHubReadmeFetcher::new("http://127.0.0.1:9", None, Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch_readme("not a url").await.unwrap_err();
        assert!(matches!(err, DocFetchError::InvalidUrl(_)));
    }
}
