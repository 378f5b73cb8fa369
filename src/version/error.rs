use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No network connectivity (could not reach {host})")]
    Offline { host: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("No usable response from any mirror: {}", .failures.join("; "))]
    AllMirrorsFailed { failures: Vec<String> },

    #[error("No version string found in content from {url}")]
    VersionNotFound { url: String },

    #[error("No version sources configured")]
    NoSources,
}

#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Invalid artifact pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
