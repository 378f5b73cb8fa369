//! Detection of processes holding the installed AppImage open

use std::path::Path;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::install::error::InstallError;
use crate::install::system::SystemOps;
use crate::retry::RetryPolicy;

/// Result of waiting for a file to be released
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusyState {
    /// Nobody holds the file
    Free,
    /// The file could not be checked (no `lsof`), treated as free by callers
    Unchecked,
    /// Still held after the policy ran out
    TimedOut { pids: Vec<u32> },
}

/// Poll `path` until no process holds it or the policy is exhausted
pub async fn wait_for_release(
    system: &dyn SystemOps,
    path: &Path,
    policy: &RetryPolicy,
) -> Result<BusyState, InstallError> {
    if !system.has_tool("lsof") {
        warn!("lsof not available; skipping busy check for {:?}", path);
        return Ok(BusyState::Unchecked);
    }

    let attempts = policy.max_attempts();
    let mut attempt = 0;
    loop {
        let pids = system.open_file_holders(path)?;
        if pids.is_empty() {
            debug!("{:?} is not in use", path);
            return Ok(BusyState::Free);
        }

        if attempt + 1 >= attempts {
            info!("{:?} still in use by {:?} after {} checks", path, pids, attempts);
            return Ok(BusyState::TimedOut { pids });
        }

        let delay = policy.delay_for(attempt);
        debug!("{:?} in use by {:?}; re-checking in {:?}", path, pids, delay);
        sleep(delay).await;
        attempt += 1;
    }
}

/// Terminate the holders of `path`: SIGTERM first, SIGKILL for survivors
pub async fn terminate_holders(
    system: &dyn SystemOps,
    path: &Path,
    pids: &[u32],
    policy: &RetryPolicy,
) -> Result<BusyState, InstallError> {
    for &pid in pids {
        info!("Sending SIGTERM to {}", pid);
        if let Err(e) = system.terminate(pid, false) {
            warn!("Failed to terminate {}: {}", pid, e);
        }
    }

    let survivors = match wait_for_release(system, path, policy).await? {
        BusyState::TimedOut { pids } => pids,
        released => return Ok(released),
    };

    for &pid in &survivors {
        warn!("Process {} ignored SIGTERM; sending SIGKILL", pid);
        if let Err(e) = system.terminate(pid, true) {
            warn!("Failed to kill {}: {}", pid, e);
        }
    }

    wait_for_release(system, path, policy).await
}
