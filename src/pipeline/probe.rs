//! Repository existence probe.
//!
//! Resolves the candidate's staging repository URL and performs a single
//! GET against it. Anything other than HTTP 200 (including transport
//! failures) is reported as `Reachability::Unreachable`, never as an error.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{Patterns, UrlStrategy, VoteCheckConfig};
use crate::error::{ConfigError, ProbeError};
use crate::pipeline::types::CandidateId;

/// Result of probing a repository URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable { diagnostic: String },
}

/// Resolve the repository URL for a candidate.
pub fn resolve_url(
    strategy: UrlStrategy,
    config: &VoteCheckConfig,
    patterns: &Patterns,
    id: &CandidateId,
    body: &str,
) -> Result<String, ProbeError> {
    match strategy {
        UrlStrategy::Constructed => Ok(config.repository_url(id)),
        UrlStrategy::Extracted => patterns
            .repository_url
            .find(body)
            .map(|m| m.as_str().to_string())
            .ok_or(ProbeError::NoUrl),
    }
}

/// Existence check against a repository URL.
#[async_trait]
pub trait RepositoryProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Reachability;
}

/// `RepositoryProbe` backed by a reqwest client; one request, no retries.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(concat!("vote-check/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    /// Underlying client, shared with other HTTP side effects.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl RepositoryProbe for HttpProbe {
    async fn probe(&self, url: &str) -> Reachability {
        debug!(url, "Checking to see if repo exists");

        // The body is never read; dropping the response closes it.
        match self.client.get(url).send().await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => Reachability::Reachable,
            Ok(response) => {
                let status = response.status();
                warn!(url, status = status.as_u16(), "Unable to find release repo");
                Reachability::Unreachable {
                    diagnostic: format!(
                        "Unable to find release repo {url}, error code {}:{}",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ),
                }
            }
            Err(e) => {
                let err = ProbeError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                };
                warn!(url, error = %err, "Release repo unreachable");
                Reachability::Unreachable {
                    diagnostic: format!("Unable to find release repo {url}: {err}"),
                }
            }
        }
    }
}
