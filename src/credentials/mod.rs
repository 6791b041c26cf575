//! GitHub OAuth token handling
//!
//! Composer downloads dist archives from the GitHub API, which is heavily
//! rate limited without authentication. A token is only handed to composer
//! after the rate limit endpoint has accepted it and reports quota left.

pub mod github;

pub use github::GithubApi;

use crate::error::ComposerResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Environment variable carrying the token
pub const TOKEN_VAR: &str = "COMPOSER_GITHUB_OAUTH_TOKEN";

const TOKEN_URL: &str = "https://github.com/settings/applications/new";

/// Source of GitHub rate limit documents
#[async_trait]
pub trait RateLimitClient: Send + Sync {
    /// JSON body of `GET /rate_limit` made with `token`
    ///
    /// Error statuses are not failures; their bodies are returned as is.
    async fn rate_limit(&self, token: &str) -> ComposerResult<Value>;
}

/// What to do with the configured token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialDecision {
    /// Token accepted with quota left; store it in composer's config
    Configure,
    /// Build on without the token, logging the message
    SkipWithWarning(String),
    /// No token configured
    Absent,
}

/// Decides whether a token should be configured
#[derive(Clone)]
pub struct CredentialGate {
    client: Arc<dyn RateLimitClient>,
}

impl CredentialGate {
    pub fn new(client: Arc<dyn RateLimitClient>) -> Self {
        Self { client }
    }

    /// Check `token` against the rate limit endpoint
    ///
    /// A blank or missing token never reaches the network. Transport and
    /// decode errors are returned as errors, not as a skip.
    pub async fn decide(&self, token: Option<&str>) -> ComposerResult<CredentialDecision> {
        let token = match token.map(str::trim) {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(CredentialDecision::Absent),
        };

        let doc = self.client.rate_limit(token).await?;
        Ok(evaluate(&doc))
    }
}

/// Apply both checks to a rate limit document
pub fn evaluate(doc: &Value) -> CredentialDecision {
    if doc.get("resources").is_none() {
        let reason = doc
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("no rate limit information returned");
        debug!("GitHub rejected the token: {}", reason);
        return CredentialDecision::SkipWithWarning(rejected_warning(reason));
    }

    let remaining = doc
        .pointer("/resources/core/remaining")
        .and_then(Value::as_i64)
        .unwrap_or(0);
    debug!("GitHub core rate limit remaining: {}", remaining);

    if remaining > 0 {
        CredentialDecision::Configure
    } else {
        CredentialDecision::SkipWithWarning(exhausted_warning())
    }
}

fn rejected_warning(reason: &str) -> String {
    format!(
        "The GitHub OAuth token was not accepted ({}). \
         Composer will continue by downloading from source, which might result in slower downloads. \
         Please obtain a GitHub OAuth token by registering your application at {}. \
         Then set {} in your environment to the value of this token.",
        reason, TOKEN_URL, TOKEN_VAR
    )
}

fn exhausted_warning() -> String {
    format!(
        "The GitHub api rate limit has been exceeded. \
         Composer will continue by downloading from source, which might result in slower downloads. \
         You can increase your rate limit with a GitHub OAuth token. \
         Please obtain a GitHub OAuth token by registering your application at {}. \
         Then set {} in your environment to the value of this token.",
        TOKEN_URL, TOKEN_VAR
    )
}
