//! Install/update decision

use crate::version::semver::AppVersion;

/// What to do given the installed and the latest published version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing is installed yet
    Install { target: AppVersion },
    /// Installed version differs from the latest one
    Update {
        /// `None` when the installed file name carries no version
        from: Option<AppVersion>,
        to: AppVersion,
    },
    /// Installed version is the latest; a forced reinstall may still be offered
    UpToDate { version: AppVersion },
    /// The latest version could not be determined
    Unavailable,
}

impl Decision {
    /// True for an update that moves to an older version
    pub fn is_downgrade(&self) -> bool {
        matches!(self, Decision::Update { from: Some(from), to } if from > to)
    }
}

/// Decide between install, update and up-to-date
///
/// `installed` is `None` when nothing is installed and `Some(None)` when an
/// artifact exists whose version is unknown.
pub fn decide(installed: Option<Option<&AppVersion>>, latest: Option<&AppVersion>) -> Decision {
    let Some(latest) = latest else {
        return Decision::Unavailable;
    };

    match installed {
        None => Decision::Install {
            target: latest.clone(),
        },
        Some(Some(current)) if current == latest => Decision::UpToDate {
            version: latest.clone(),
        },
        Some(current) => Decision::Update {
            from: current.cloned(),
            to: latest.clone(),
        },
    }
}
