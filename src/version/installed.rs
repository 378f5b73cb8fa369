//! Inspection of the locally installed AppImage

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;
use tracing::debug;

use crate::version::error::InspectError;
use crate::version::semver::AppVersion;

/// File name glob for installed artifacts inside the application directory
pub const ARTIFACT_GLOB: &str = "Cursor-*.AppImage";

static ARTIFACT_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Cursor-(\d+\.\d+\.\d+)").unwrap());

/// An AppImage found in the application directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub path: PathBuf,
    /// `None` when the file name carries no recognizable version
    pub version: Option<AppVersion>,
    pub modified: SystemTime,
}

/// Extract the version embedded in an artifact file name
///
/// Examples:
/// - "Cursor-1.5.6-x86_64.AppImage" -> Some(1.5.6)
/// - "Cursor-latest.AppImage" -> None
pub fn version_from_file_name(file_name: &str) -> Option<AppVersion> {
    ARTIFACT_VERSION_RE
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// List every artifact in `app_dir`, newest modification time first
pub fn list_artifacts(app_dir: &Path) -> Result<Vec<InstalledArtifact>, InspectError> {
    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&app_dir.to_string_lossy()),
        ARTIFACT_GLOB
    );

    let mut artifacts = Vec::new();
    for path in glob::glob(&pattern)?.filter_map(Result::ok) {
        if !path.is_file() {
            continue;
        }

        let modified = path
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|source| InspectError::Io {
                path: path.clone(),
                source,
            })?;
        let version = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(version_from_file_name);

        artifacts.push(InstalledArtifact {
            path,
            version,
            modified,
        });
    }

    artifacts.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.path.cmp(&a.path)));
    debug!("Found {} artifact(s) in {:?}", artifacts.len(), app_dir);

    Ok(artifacts)
}

/// The current installation: the most recently modified artifact, if any
pub fn current_artifact(app_dir: &Path) -> Result<Option<InstalledArtifact>, InspectError> {
    Ok(list_artifacts(app_dir)?.into_iter().next())
}
