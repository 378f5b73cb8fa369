//! Atomic placement, timestamped backup and pruning of artifacts

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::install::error::InstallError;
use crate::version::installed::list_artifacts;

const BACKUP_MARKER: &str = ".backup-";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Copy `src` to `dest` through a hidden temp sibling and rename it into place
pub fn copy_atomic(src: &Path, dest: &Path, mode: u32) -> Result<(), InstallError> {
    let parent = dest.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(parent).map_err(InstallError::io(parent))?;

    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{name}.tmp"));

    let result = fs::copy(src, &tmp)
        .map_err(InstallError::io(src))
        .and_then(|_| {
            fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))
                .map_err(InstallError::io(&tmp))
        })
        .and_then(|()| fs::rename(&tmp, dest).map_err(InstallError::io(dest)));

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Path of the backup for `artifact` taken at `now`
pub fn backup_path(artifact: &Path, now: DateTime<Local>) -> PathBuf {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.with_file_name(format!(
        "{name}{BACKUP_MARKER}{}",
        now.format(BACKUP_TIMESTAMP_FORMAT)
    ))
}

/// All artifact backups in `dir`
pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(InstallError::io(dir)(e)),
    };

    let mut backups: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("Cursor-") && n.contains(BACKUP_MARKER))
        })
        .collect();
    backups.sort();
    Ok(backups)
}

/// Back up `artifact` next to itself and drop every older backup
pub fn backup_artifact(artifact: &Path, now: DateTime<Local>) -> Result<PathBuf, InstallError> {
    let backup = backup_path(artifact, now);
    let mode = fs::metadata(artifact)
        .map_err(InstallError::io(artifact))?
        .permissions()
        .mode();

    copy_atomic(artifact, &backup, mode)?;
    info!("Backed up {:?} to {:?}", artifact, backup);

    if let Some(dir) = artifact.parent() {
        for old in list_backups(dir)?.into_iter().filter(|b| *b != backup) {
            debug!("Removing old backup {:?}", old);
            fs::remove_file(&old).map_err(InstallError::io(&old))?;
        }
    }

    Ok(backup)
}

/// Delete every artifact in `app_dir` except `keep`
pub fn prune_artifacts(app_dir: &Path, keep: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let mut removed = Vec::new();
    for artifact in list_artifacts(app_dir)? {
        if artifact.path == keep {
            continue;
        }
        match fs::remove_file(&artifact.path) {
            Ok(()) => {
                info!("Removed old version {:?}", artifact.path);
                removed.push(artifact.path);
            }
            Err(e) => {
                warn!("Failed to remove {:?}: {}", artifact.path, e);
                return Err(InstallError::io(&artifact.path)(e));
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 9, 1, h, m, s).unwrap()
    }

    #[test]
    fn copy_atomic_sets_mode_and_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        fs::write(&src, b"payload").unwrap();
        let dest = dir.path().join("nested/dest.AppImage");

        copy_atomic(&src, &dest, 0o755).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"payload");
        assert_eq!(fs::metadata(&dest).unwrap().permissions().mode() & 0o777, 0o755);
        assert!(!dir.path().join("nested/.dest.AppImage.tmp").exists());
    }

    #[test]
    fn copy_atomic_reports_missing_source() {
        let dir = TempDir::new().unwrap();
        let result = copy_atomic(&dir.path().join("absent"), &dir.path().join("dest"), 0o644);

        assert!(matches!(result, Err(InstallError::Io { .. })));
        assert!(!dir.path().join("dest").exists());
    }

    #[test]
    fn backup_path_appends_timestamp() {
        let path = backup_path(Path::new("/apps/Cursor-1.5.5-x86_64.AppImage"), at(8, 30, 5));
        assert_eq!(
            path,
            PathBuf::from("/apps/Cursor-1.5.5-x86_64.AppImage.backup-20250901-083005")
        );
    }

    #[test]
    fn backup_artifact_keeps_only_newest_backup() {
        let dir = TempDir::new().unwrap();
        let artifact = dir.path().join("Cursor-1.5.5-x86_64.AppImage");
        fs::write(&artifact, b"old").unwrap();

        backup_artifact(&artifact, at(8, 0, 0)).unwrap();
        let latest = backup_artifact(&artifact, at(9, 0, 0)).unwrap();

        assert_eq!(list_backups(dir.path()).unwrap(), vec![latest.clone()]);
        assert_eq!(fs::read(&latest).unwrap(), b"old");
        assert!(artifact.exists());
    }

    #[test]
    fn prune_artifacts_removes_all_but_kept() {
        let dir = TempDir::new().unwrap();
        let keep = dir.path().join("Cursor-1.5.6-x86_64.AppImage");
        let old = dir.path().join("Cursor-1.5.5-x86_64.AppImage");
        let backup = dir.path().join("Cursor-1.5.5-x86_64.AppImage.backup-20250901-080000");
        for path in [&keep, &old, &backup] {
            fs::write(path, b"x").unwrap();
        }

        let removed = prune_artifacts(dir.path(), &keep).unwrap();

        assert_eq!(removed, vec![old.clone()]);
        assert!(keep.exists());
        assert!(!old.exists());
        assert!(backup.exists());
    }

    #[test]
    fn list_backups_of_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_backups(&dir.path().join("absent")).unwrap().is_empty());
    }
}
