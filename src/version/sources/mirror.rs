//! Mirror-list version source
//!
//! Downloads a text page (typically a README listing releases) from an
//! ordered list of mirrors and extracts the first `Cursor X.Y.Z` it mentions.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::retry::{RetryPolicy, retry};
use crate::version::error::FetchError;
use crate::version::semver::AppVersion;
use crate::version::source::VersionSource;

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cursor\s+(\d+\.\d+\.\d+)").unwrap());

/// Extract the first valid `Cursor X.Y.Z` version mentioned in `content`
pub fn extract_version(content: &str) -> Option<AppVersion> {
    VERSION_RE
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| m.as_str().parse().ok())
}

/// Why a single mirror attempt was rejected
#[derive(Debug, Error)]
enum MirrorError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),

    #[error("content too small ({0} bytes)")]
    TooSmall(usize),
}

/// Version source backed by an ordered list of mirror URLs
pub struct MirrorSource {
    client: reqwest::Client,
    urls: Vec<String>,
    policy: RetryPolicy,
    min_content_bytes: usize,
}

impl MirrorSource {
    pub fn new(
        client: reqwest::Client,
        urls: Vec<String>,
        policy: RetryPolicy,
        min_content_bytes: usize,
    ) -> Self {
        Self {
            client,
            urls,
            policy,
            min_content_bytes,
        }
    }

    async fn fetch_content(&self, url: &str) -> Result<String, MirrorError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::Status(status));
        }

        let body = response.text().await?;
        if body.len() < self.min_content_bytes {
            return Err(MirrorError::TooSmall(body.len()));
        }

        Ok(body)
    }
}

#[async_trait::async_trait]
impl VersionSource for MirrorSource {
    async fn fetch_latest(&self) -> Result<AppVersion, FetchError> {
        if self.urls.is_empty() {
            return Err(FetchError::NoSources);
        }

        let mut failures = Vec::new();
        let mut unmatched = None;

        for url in &self.urls {
            debug!("Fetching version page from {}", url);

            match retry(&self.policy, |_| self.fetch_content(url)).await {
                Ok(body) => match extract_version(&body) {
                    Some(version) => {
                        info!("Latest version {} (from {})", version, url);
                        return Ok(version);
                    }
                    None => {
                        warn!("No version string in content from {}", url);
                        unmatched = Some(url.clone());
                    }
                },
                Err(e) => {
                    warn!("Mirror {} failed: {}", url, e);
                    failures.push(format!("{url}: {e}"));
                }
            }
        }

        match unmatched {
            Some(url) => Err(FetchError::VersionNotFound { url }),
            None => Err(FetchError::AllMirrorsFailed { failures }),
        }
    }
}
