//! Install journal: which steps of an install already completed
//!
//! The journal is a small JSON file in the application directory. A re-run
//! for the same target version skips steps already marked complete, so an
//! interrupted install resumes where it stopped.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::install::error::InstallError;

/// One order-sensitive side effect of an install
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStep {
    Backup,
    Place,
    Prune,
    Desktop,
    Wrapper,
    Apparmor,
}

impl InstallStep {
    /// All steps in execution order
    pub const ALL: [InstallStep; 6] = [
        InstallStep::Backup,
        InstallStep::Place,
        InstallStep::Prune,
        InstallStep::Desktop,
        InstallStep::Wrapper,
        InstallStep::Apparmor,
    ];

    /// Steps that only touch desktop integration
    pub const INTEGRATION: [InstallStep; 3] = [
        InstallStep::Desktop,
        InstallStep::Wrapper,
        InstallStep::Apparmor,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallJournal {
    /// Version the recorded steps belong to
    pub version: Option<String>,
    pub completed: Vec<InstallStep>,
    #[serde(skip)]
    path: PathBuf,
}

impl InstallJournal {
    /// Load the journal at `path`; a missing or unreadable file yields an empty one
    pub fn load(path: &Path) -> Self {
        let journal = match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str::<InstallJournal>(&content)
                .inspect_err(|e| warn!("Ignoring corrupt journal {:?}: {}", path, e))
                .unwrap_or_default(),
            Err(_) => InstallJournal::default(),
        };
        Self {
            path: path.to_path_buf(),
            ..journal
        }
    }

    /// Start tracking `version`, keeping progress only if it is the same version
    pub fn begin(&mut self, version: &str, resume: bool) {
        if !resume || self.version.as_deref() != Some(version) {
            debug!("Starting fresh journal for {}", version);
            self.version = Some(version.to_string());
            self.completed.clear();
        }
    }

    pub fn is_complete(&self, step: InstallStep) -> bool {
        self.completed.contains(&step)
    }

    pub fn is_finished(&self) -> bool {
        InstallStep::ALL.iter().all(|step| self.is_complete(*step))
    }

    /// Record `step` as done and persist immediately
    pub fn mark(&mut self, step: InstallStep) -> Result<(), InstallError> {
        if !self.is_complete(step) {
            self.completed.push(step);
        }
        self.save()
    }

    pub fn save(&self) -> Result<(), InstallError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }
        let content = serde_json::to_string_pretty(self).map_err(|source| {
            InstallError::Journal {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, content).map_err(InstallError::io(&self.path))
    }
}
