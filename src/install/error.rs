use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::version::error::InspectError;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download from {url} timed out")]
    TimedOut { url: String },

    #[error("Download returned status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("Downloaded file is empty: {0:?}")]
    EmptyDownload(PathBuf),

    #[error("Downloaded file is too small ({size} bytes, expected at least {min}): {path:?}")]
    TooSmall { path: PathBuf, size: u64, min: u64 },

    #[error("Downloaded file is not an ELF executable: {0:?}")]
    NotExecutable(PathBuf),

    #[error("{path:?} is in use by process(es) {pids:?}")]
    Busy { path: PathBuf, pids: Vec<u32> },

    #[error("Command `{command}` failed: {detail}")]
    Command { command: String, detail: String },

    #[error("No installed artifact found in {0:?}")]
    NotInstalled(PathBuf),

    #[error("Invalid install journal {path:?}: {source}")]
    Journal {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Inspect(#[from] InspectError),
}

impl InstallError {
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| InstallError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
