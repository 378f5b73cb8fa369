//! Source trait for looking up the latest published version

#[cfg(test)]
use mockall::automock;

use crate::version::error::FetchError;
use crate::version::semver::AppVersion;

/// Trait for fetching the latest released version from a remote source
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait VersionSource: Send + Sync {
    /// Fetches the latest version
    ///
    /// # Returns
    /// * `Ok(AppVersion)` - The newest published version
    /// * `Err(FetchError)` - If no source produced a version
    async fn fetch_latest(&self) -> Result<AppVersion, FetchError>;
}
