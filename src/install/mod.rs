//! Download, placement and system integration of the AppImage
//!
//! # Modules
//!
//! - [`download`]: Streams and validates the artifact
//! - [`busy`]: Waits for (or terminates) processes holding the artifact
//! - [`files`]: Atomic copy, timestamped backup and pruning
//! - [`integration`]: Desktop entry, icon, wrapper, symlink, AppArmor profile
//! - [`journal`]: Completion markers so an interrupted install can resume
//! - [`system`]: External tools and privileged writes
//! - [`error`]: Error type for all of the above

pub mod busy;
pub mod download;
pub mod error;
pub mod files;
pub mod integration;
pub mod journal;
pub mod system;

use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use crate::config::Config;
use crate::environment::Paths;
use crate::install::busy::{BusyState, terminate_holders, wait_for_release};
use crate::install::error::InstallError;
use crate::install::journal::{InstallJournal, InstallStep};
use crate::install::system::SystemOps;
use crate::prompt::Confirm;
use crate::retry::RetryPolicy;
use crate::version::installed::current_artifact;
use crate::version::semver::AppVersion;

/// What an install did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub artifact: PathBuf,
    pub backup: Option<PathBuf>,
    pub removed: Vec<PathBuf>,
    /// Steps skipped because the journal marked them complete
    pub resumed: Vec<InstallStep>,
    pub apparmor_loaded: bool,
}

/// Places a downloaded artifact and wires it into the desktop
pub struct Installer<'a> {
    system: &'a dyn SystemOps,
    client: &'a reqwest::Client,
    paths: &'a Paths,
    config: &'a Config,
}

impl<'a> Installer<'a> {
    pub fn new(
        system: &'a dyn SystemOps,
        client: &'a reqwest::Client,
        paths: &'a Paths,
        config: &'a Config,
    ) -> Self {
        Self {
            system,
            client,
            paths,
            config,
        }
    }

    fn busy_policy(&self) -> RetryPolicy {
        RetryPolicy::backoff(self.config.busy_retries, self.config.busy_delay())
    }

    /// Wait until nobody holds `path`, offering to terminate the holders
    pub async fn ensure_released(
        &self,
        path: &Path,
        confirm: &mut dyn Confirm,
    ) -> Result<(), InstallError> {
        let policy = self.busy_policy();
        let pids = match wait_for_release(self.system, path, &policy).await? {
            BusyState::TimedOut { pids } => pids,
            BusyState::Free | BusyState::Unchecked => return Ok(()),
        };

        let question = format!("Cursor is still running (PID {pids:?}). Close it now?");
        if !confirm.confirm(&question, false).await {
            return Err(InstallError::Busy {
                path: path.to_path_buf(),
                pids,
            });
        }

        match terminate_holders(self.system, path, &pids, &policy).await? {
            BusyState::TimedOut { pids } => Err(InstallError::Busy {
                path: path.to_path_buf(),
                pids,
            }),
            BusyState::Free | BusyState::Unchecked => Ok(()),
        }
    }

    /// Install `downloaded` as `version`.
    ///
    /// Steps already recorded for the same version are skipped unless
    /// `force` is set.
    pub async fn install(
        &self,
        downloaded: &Path,
        version: &AppVersion,
        force: bool,
        confirm: &mut dyn Confirm,
    ) -> Result<InstallReport, InstallError> {
        let file_name = downloaded
            .file_name()
            .ok_or_else(|| InstallError::NotInstalled(downloaded.to_path_buf()))?;
        let dest = self.paths.app_dir.join(file_name);

        let mut journal = InstallJournal::load(&self.paths.journal);
        journal.begin(&version.to_string(), !force);
        if journal.is_complete(InstallStep::Place) && !dest.exists() {
            debug!("Journal claims {:?} was placed but it is missing", dest);
            journal.begin(&version.to_string(), false);
        }

        let previous = current_artifact(&self.paths.app_dir)?;
        let mut report = InstallReport {
            artifact: dest.clone(),
            backup: None,
            removed: Vec::new(),
            resumed: Vec::new(),
            apparmor_loaded: false,
        };

        if let Some(previous) = &previous {
            if !journal.is_complete(InstallStep::Place) {
                self.ensure_released(&previous.path, confirm).await?;
            }
        }

        if journal.is_complete(InstallStep::Backup) {
            report.resumed.push(InstallStep::Backup);
        } else {
            if let Some(previous) = &previous {
                report.backup = Some(files::backup_artifact(&previous.path, Local::now())?);
            }
            journal.mark(InstallStep::Backup)?;
        }

        if journal.is_complete(InstallStep::Place) {
            report.resumed.push(InstallStep::Place);
        } else {
            files::copy_atomic(downloaded, &dest, 0o755)?;
            info!("Installed {:?}", dest);
            journal.mark(InstallStep::Place)?;
        }

        if journal.is_complete(InstallStep::Prune) {
            report.resumed.push(InstallStep::Prune);
        } else {
            report.removed = files::prune_artifacts(&self.paths.app_dir, &dest)?;
            journal.mark(InstallStep::Prune)?;
        }

        let remaining: Vec<InstallStep> = InstallStep::INTEGRATION
            .into_iter()
            .filter(|step| {
                let done = journal.is_complete(*step);
                if done {
                    report.resumed.push(*step);
                }
                !done
            })
            .collect();
        report.apparmor_loaded = self
            .integrate_steps(&dest, &remaining, Some(&mut journal))
            .await?;

        info!(
            "Install of {} finished ({} step(s) resumed)",
            version,
            report.resumed.len()
        );
        Ok(report)
    }

    /// Recreate desktop entry, icon, wrapper, symlink and AppArmor profile for `artifact`
    pub async fn integrate(&self, artifact: &Path) -> Result<bool, InstallError> {
        self.integrate_steps(artifact, &InstallStep::INTEGRATION, None)
            .await
    }

    async fn integrate_steps(
        &self,
        artifact: &Path,
        steps: &[InstallStep],
        mut journal: Option<&mut InstallJournal>,
    ) -> Result<bool, InstallError> {
        let mut apparmor_loaded = false;

        for step in steps {
            match step {
                InstallStep::Desktop => {
                    integration::fetch_icon(
                        self.client,
                        &self.config.icon_url,
                        &self.paths.icon,
                        self.config.http_timeout(),
                    )
                    .await;
                    integration::install_desktop_entry(self.system, self.paths, artifact)?;
                }
                InstallStep::Wrapper => {
                    integration::install_wrapper(self.system, self.paths, artifact)?;
                }
                InstallStep::Apparmor => {
                    apparmor_loaded =
                        integration::install_apparmor_profile(self.system, self.paths)?;
                }
                InstallStep::Backup | InstallStep::Place | InstallStep::Prune => continue,
            }

            if let Some(journal) = journal.as_deref_mut() {
                journal.mark(*step)?;
            }
        }

        Ok(apparmor_loaded)
    }
}
