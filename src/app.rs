//! Operations behind the menu entries, sharing one explicit context

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{Config, DEFAULT_PING_TIMEOUT_SECS};
use crate::environment::{Arch, OsInfo, Paths};
use crate::install::download::{RemoteArtifact, Validation, download_artifact};
use crate::install::error::InstallError;
use crate::install::journal::InstallJournal;
use crate::install::system::SystemOps;
use crate::install::{InstallReport, Installer};
use crate::prompt::Confirm;
use crate::version::checker::{Decision, decide};
use crate::version::error::{FetchError, InspectError};
use crate::version::installed::{InstalledArtifact, current_artifact};
use crate::version::semver::AppVersion;
use crate::version::source::VersionSource;

/// Process exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Error,
    NoAction,
    Cancelled,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Error => 1,
            ExitStatus::NoAction => 2,
            ExitStatus::Cancelled => 3,
        }
    }
}

/// Result of the check/install entry
#[derive(Debug)]
pub enum Outcome {
    Installed {
        version: AppVersion,
        report: InstallReport,
    },
    UpToDate {
        version: AppVersion,
    },
    Declined,
    Failed(String),
}

impl Outcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            Outcome::Installed { .. } => ExitStatus::Success,
            Outcome::UpToDate { .. } => ExitStatus::NoAction,
            Outcome::Declined => ExitStatus::Cancelled,
            Outcome::Failed(_) => ExitStatus::Error,
        }
    }
}

/// Snapshot shown by the info entry
#[derive(Debug)]
pub struct Info {
    pub installed: Option<InstalledArtifact>,
    pub latest: Result<AppVersion, String>,
    pub arch: Arch,
    pub os: Option<OsInfo>,
    pub paths: Paths,
}

/// Everything an operation needs: configuration, host layout and collaborators
pub struct App {
    pub config: Config,
    pub paths: Paths,
    pub arch: Arch,
    pub os: Option<OsInfo>,
    system: Box<dyn SystemOps>,
    source: Box<dyn VersionSource>,
    client: reqwest::Client,
}

impl App {
    pub fn new(
        config: Config,
        paths: Paths,
        arch: Arch,
        system: Box<dyn SystemOps>,
        source: Box<dyn VersionSource>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            config,
            paths,
            arch,
            os: None,
            system,
            source,
            client,
        }
    }

    /// Attach the detected operating system, shown by the info entry
    pub fn with_os(mut self, os: OsInfo) -> Self {
        self.os = Some(os);
        self
    }

    fn installer(&self) -> Installer<'_> {
        Installer::new(&*self.system, &self.client, &self.paths, &self.config)
    }

    pub fn installed(&self) -> Result<Option<InstalledArtifact>, InspectError> {
        current_artifact(&self.paths.app_dir)
    }

    /// Probe connectivity, then ask the version source
    pub async fn check_latest(&self) -> Result<AppVersion, FetchError> {
        if self.system.has_tool("ping") {
            let timeout = Duration::from_secs(DEFAULT_PING_TIMEOUT_SECS);
            if !self.system.probe_network(&self.config.ping_host, timeout) {
                warn!("Connectivity probe to {} failed", self.config.ping_host);
                return Err(FetchError::Offline {
                    host: self.config.ping_host.clone(),
                });
            }
        }
        self.source.fetch_latest().await
    }

    /// Whether the journal holds an unfinished install of `version`
    fn unfinished_install(&self, version: &AppVersion) -> bool {
        let journal = InstallJournal::load(&self.paths.journal);
        journal.version.as_deref() == Some(version.to_string().as_str()) && !journal.is_finished()
    }

    async fn latest_with_retry(&self, confirm: &mut dyn Confirm) -> Option<AppVersion> {
        loop {
            match self.check_latest().await {
                Ok(version) => return Some(version),
                Err(e) => {
                    error!("Version check failed: {}", e);
                    let question = format!("Could not determine the latest version ({e}). Retry?");
                    if !confirm.confirm(&question, true).await {
                        return None;
                    }
                }
            }
        }
    }

    async fn download_with_retry(
        &self,
        artifact: &RemoteArtifact,
        confirm: &mut dyn Confirm,
    ) -> Option<PathBuf> {
        let validation = Validation {
            min_bytes: self.config.min_artifact_bytes,
            verify_elf: self.config.verify_elf,
        };
        loop {
            match download_artifact(&self.client, artifact, &self.paths.download_dir, validation)
                .await
            {
                Ok(path) => return Some(path),
                Err(e) => {
                    error!("Download failed: {}", e);
                    let question = format!("Download failed ({e}). Retry?");
                    if !confirm.confirm(&question, true).await {
                        return None;
                    }
                }
            }
        }
    }

    /// The check/install/update entry
    pub async fn check_and_install(&self, confirm: &mut dyn Confirm) -> Outcome {
        let installed = match self.installed() {
            Ok(installed) => installed,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        let Some(latest) = self.latest_with_retry(confirm).await else {
            return Outcome::Failed("latest version unavailable".to_string());
        };

        let decision = decide(
            installed.as_ref().map(|a| a.version.as_ref()),
            Some(&latest),
        );
        info!("Decision: {:?}", decision);

        let force = match &decision {
            Decision::Install { .. } => false,
            Decision::Update { from, to } => {
                let from = from
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                let question = if decision.is_downgrade() {
                    format!("Installed {from} is newer than published {to}. Replace it?")
                } else {
                    format!("Update Cursor {from} -> {to}?")
                };
                if !confirm.confirm(&question, true).await {
                    return Outcome::Declined;
                }
                false
            }
            Decision::UpToDate { version } => {
                if let Some(artifact) = &installed {
                    if self.unfinished_install(version) {
                        let question = format!(
                            "The previous install of Cursor {version} did not finish. Complete it now?"
                        );
                        if !confirm.confirm(&question, true).await {
                            return Outcome::Declined;
                        }
                        info!("Resuming install of {} from the journal", version);
                        return self.install(&artifact.path, latest, false, confirm).await;
                    }
                }

                let question = format!("Cursor {version} is up to date. Reinstall anyway?");
                if !confirm.confirm(&question, false).await {
                    return Outcome::UpToDate {
                        version: version.clone(),
                    };
                }
                true
            }
            Decision::Unavailable => {
                return Outcome::Failed("latest version unavailable".to_string());
            }
        };

        let artifact = RemoteArtifact::new(&self.config.download_url, &latest, self.arch);
        let Some(downloaded) = self.download_with_retry(&artifact, confirm).await else {
            return Outcome::Declined;
        };

        self.install(&downloaded, latest, force, confirm).await
    }

    async fn install(
        &self,
        source: &Path,
        version: AppVersion,
        force: bool,
        confirm: &mut dyn Confirm,
    ) -> Outcome {
        match self
            .installer()
            .install(source, &version, force, confirm)
            .await
        {
            Ok(report) => Outcome::Installed { version, report },
            Err(InstallError::Busy { pids, .. }) => {
                Outcome::Failed(format!("Cursor is still running (PID {pids:?})"))
            }
            Err(e) => {
                error!("Install failed: {}", e);
                Outcome::Failed(e.to_string())
            }
        }
    }

    /// The shortcut-only entry: redo desktop integration for the current artifact
    pub async fn repair_shortcuts(&self) -> Result<InstalledArtifact, InstallError> {
        let artifact = self
            .installed()?
            .ok_or_else(|| InstallError::NotInstalled(self.paths.app_dir.clone()))?;
        self.installer().integrate(&artifact.path).await?;
        Ok(artifact)
    }

    pub async fn info(&self) -> Result<Info, InspectError> {
        let installed = self.installed()?;
        let latest = self.check_latest().await.map_err(|e| e.to_string());
        Ok(Info {
            installed,
            latest,
            arch: self.arch,
            os: self.os.clone(),
            paths: self.paths.clone(),
        })
    }
}
