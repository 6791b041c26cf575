//! GitHub rate limit API client

use super::RateLimitClient;
use crate::error::{ComposerError, ComposerResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Public GitHub API root
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Timeout for the whole request, connect through body
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Rate limit client backed by the GitHub REST API
#[derive(Debug, Clone)]
pub struct GithubApi {
    base_url: String,
    timeout: Duration,
}

impl GithubApi {
    pub fn new() -> Self {
        Self::with_base_url(GITHUB_API_URL)
    }

    /// Client for a different API root (GitHub Enterprise, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    fn rate_limit_url(&self) -> String {
        format!("{}/rate_limit", self.base_url)
    }

    fn fetch(url: &str, token: &str, timeout: Duration) -> ComposerResult<serde_json::Value> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent
            .get(url)
            .header("Authorization", format!("token {}", token))
            .header("Accept", "application/vnd.github+json")
            .call()
            .map_err(|e| ComposerError::CredentialCheck(format!("GET {}: {}", url, e)))?;

        debug!("GET {} answered {}", url, response.status());

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ComposerError::CredentialCheck(format!("reading {}: {}", url, e)))?;

        serde_json::from_str(&body).map_err(|e| {
            ComposerError::CredentialCheck(format!("decoding response from {}: {}", url, e))
        })
    }
}

impl Default for GithubApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitClient for GithubApi {
    async fn rate_limit(&self, token: &str) -> ComposerResult<serde_json::Value> {
        let url = self.rate_limit_url();
        let token = token.to_string();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || Self::fetch(&url, &token, timeout))
            .await
            .map_err(|e| ComposerError::Internal(format!("rate limit request task failed: {}", e)))?
    }
}
