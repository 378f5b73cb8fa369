//! Host operations that need external tools or elevated privileges

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::install::error::InstallError;

/// Side effects outside the user's own files
///
/// Every privileged write goes through this trait so that the install flow
/// can run against a sandbox in tests.
#[cfg_attr(test, automock)]
pub trait SystemOps: Send + Sync {
    /// Whether an executable is available in PATH
    fn has_tool(&self, name: &str) -> bool;

    /// Single ICMP echo to `host`
    fn probe_network(&self, host: &str, timeout: Duration) -> bool;

    /// PIDs of processes holding `path` open
    fn open_file_holders(&self, path: &Path) -> Result<Vec<u32>, InstallError>;

    /// Send SIGTERM, or SIGKILL when `force` is set
    fn terminate(&self, pid: u32, force: bool) -> Result<(), InstallError>;

    /// Write `contents` to a root-owned location with the given mode
    fn write_privileged(&self, dest: &Path, contents: &[u8], mode: u32)
    -> Result<(), InstallError>;

    /// Point `link` at `target`, replacing an existing link
    fn symlink_privileged(&self, target: &Path, link: &Path) -> Result<(), InstallError>;

    /// Load or replace an AppArmor profile in the kernel
    fn reload_apparmor(&self, profile: &Path) -> Result<(), InstallError>;
}

/// The real host, privileged steps run through `sudo`
#[derive(Debug, Default)]
pub struct HostSystem;

impl HostSystem {
    pub fn new() -> Self {
        Self
    }
}

fn describe(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run `command`, turning spawn failures and non-zero exits into errors
fn run(command: &mut Command) -> Result<Output, InstallError> {
    let description = describe(command);
    debug!("Running `{}`", description);

    let output = command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| InstallError::Command {
            command: description.clone(),
            detail: e.to_string(),
        })?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(InstallError::Command {
            command: description,
            detail: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        })
    }
}

/// Parse `lsof -t` output: one PID per line
pub fn parse_pids(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

impl SystemOps for HostSystem {
    fn has_tool(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    fn probe_network(&self, host: &str, timeout: Duration) -> bool {
        let secs = timeout.as_secs().max(1).to_string();
        Command::new("ping")
            .args(["-c", "1", "-W", &secs, host])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }

    fn open_file_holders(&self, path: &Path) -> Result<Vec<u32>, InstallError> {
        let description = format!("lsof -t -- {}", path.display());
        // lsof exits with 1 when nobody holds the file, so the status is not checked
        let output = Command::new("lsof")
            .arg("-t")
            .arg("--")
            .arg(path)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| InstallError::Command {
                command: description,
                detail: e.to_string(),
            })?;

        Ok(parse_pids(&String::from_utf8_lossy(&output.stdout)))
    }

    fn terminate(&self, pid: u32, force: bool) -> Result<(), InstallError> {
        let signal = if force { "-KILL" } else { "-TERM" };
        run(Command::new("kill").arg(signal).arg(pid.to_string())).map(|_| ())
    }

    fn write_privileged(
        &self,
        dest: &Path,
        contents: &[u8],
        mode: u32,
    ) -> Result<(), InstallError> {
        let tmp_dir = std::env::temp_dir();
        let mut staged = tempfile::NamedTempFile::new_in(&tmp_dir)
            .map_err(InstallError::io(&tmp_dir))?;
        let staged_path = staged.path().to_path_buf();
        staged
            .write_all(contents)
            .and_then(|()| staged.flush())
            .map_err(InstallError::io(&staged_path))?;

        run(Command::new("sudo")
            .arg("install")
            .arg("-D")
            .arg("-m")
            .arg(format!("{mode:o}"))
            .arg(&staged_path)
            .arg(dest))
        .map(|_| ())
    }

    fn symlink_privileged(&self, target: &Path, link: &Path) -> Result<(), InstallError> {
        if let Some(parent) = link.parent() {
            run(Command::new("sudo").arg("mkdir").arg("-p").arg(parent))?;
        }
        run(Command::new("sudo")
            .arg("ln")
            .arg("-sfn")
            .arg(target)
            .arg(link))
        .map(|_| ())
    }

    fn reload_apparmor(&self, profile: &Path) -> Result<(), InstallError> {
        run(Command::new("sudo")
            .arg("apparmor_parser")
            .arg("-r")
            .arg(profile))
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", vec![])]
    #[case("1234\n", vec![1234])]
    #[case("42\n7\n42\n", vec![7, 42])]
    #[case("  99 \ngarbage\n", vec![99])]
    fn parse_pids_reads_one_pid_per_line(#[case] output: &str, #[case] expected: Vec<u32>) {
        assert_eq!(parse_pids(output), expected);
    }

    #[test]
    fn describe_joins_program_and_args() {
        let mut command = Command::new("sudo");
        command.arg("apparmor_parser").arg("-r").arg("/etc/apparmor.d/x");
        assert_eq!(describe(&command), "sudo apparmor_parser -r /etc/apparmor.d/x");
    }

    #[test]
    fn run_reports_non_zero_exit_as_command_error() {
        let err = run(Command::new("sh").arg("-c").arg("echo boom >&2; exit 3")).unwrap_err();

        match err {
            InstallError::Command { command, detail } => {
                assert_eq!(command, "sh -c echo boom >&2; exit 3");
                assert!(detail.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn host_system_detects_missing_tool() {
        assert!(!HostSystem::new().has_tool("definitely-not-a-real-tool-xyz"));
    }
}
