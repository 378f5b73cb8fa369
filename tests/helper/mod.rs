//! Test utilities: a sandboxed host and an app wired to a local mirror

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use cursor_installer::app::App;
use cursor_installer::config::Config;
use cursor_installer::environment::{Arch, Paths};
use cursor_installer::http;
use cursor_installer::install::error::InstallError;
use cursor_installer::install::system::SystemOps;
use cursor_installer::retry::RetryPolicy;
use cursor_installer::version::sources::MirrorSource;

/// Observable side effects of a [`SandboxSystem`]
#[derive(Debug, Default)]
pub struct SandboxState {
    /// PIDs reported as holding any file; cleared by a terminate call
    pub holders: Mutex<Vec<u32>>,
    pub terminated: Mutex<Vec<(u32, bool)>>,
    pub reloaded: Mutex<Vec<PathBuf>>,
}

/// Host stand-in that performs privileged writes directly inside the sandbox
pub struct SandboxSystem {
    tools: Vec<String>,
    state: Arc<SandboxState>,
}

impl SandboxSystem {
    pub fn new(tools: &[&str]) -> (Self, Arc<SandboxState>) {
        let state = Arc::new(SandboxState::default());
        let system = Self {
            tools: tools.iter().map(|t| t.to_string()).collect(),
            state: Arc::clone(&state),
        };
        (system, state)
    }

    pub fn busy(tools: &[&str], pids: &[u32]) -> (Self, Arc<SandboxState>) {
        let (system, state) = Self::new(tools);
        *state.holders.lock().unwrap() = pids.to_vec();
        (system, state)
    }
}

impl SystemOps for SandboxSystem {
    fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t == name)
    }

    fn probe_network(&self, _host: &str, _timeout: Duration) -> bool {
        true
    }

    fn open_file_holders(&self, _path: &Path) -> Result<Vec<u32>, InstallError> {
        Ok(self.state.holders.lock().unwrap().clone())
    }

    fn terminate(&self, pid: u32, force: bool) -> Result<(), InstallError> {
        self.state.terminated.lock().unwrap().push((pid, force));
        self.state.holders.lock().unwrap().retain(|p| *p != pid);
        Ok(())
    }

    fn write_privileged(&self, dest: &Path, contents: &[u8], mode: u32) -> Result<(), InstallError> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }
        fs::write(dest, contents).map_err(InstallError::io(dest))?;
        fs::set_permissions(dest, fs::Permissions::from_mode(mode)).map_err(InstallError::io(dest))
    }

    fn symlink_privileged(&self, target: &Path, link: &Path) -> Result<(), InstallError> {
        if let Some(parent) = link.parent() {
            fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
        }
        if link.symlink_metadata().is_ok() {
            fs::remove_file(link).map_err(InstallError::io(link))?;
        }
        std::os::unix::fs::symlink(target, link).map_err(InstallError::io(link))
    }

    fn reload_apparmor(&self, profile: &Path) -> Result<(), InstallError> {
        self.state.reloaded.lock().unwrap().push(profile.to_path_buf());
        Ok(())
    }
}

/// Smallest artifact size accepted by [`test_config`]
pub const TEST_MIN_ARTIFACT_BYTES: u64 = 64;

/// Configuration pointing every URL at `server_url` with fast retries
pub fn test_config(server_url: &str) -> Config {
    Config {
        version_urls: vec![format!("{server_url}/README.md")],
        download_url: format!("{server_url}/download/{{version}}/{{arch}}/Cursor.AppImage"),
        icon_url: format!("{server_url}/icon.png"),
        fetch_retries: 1,
        retry_delay_secs: 0,
        busy_retries: 2,
        busy_delay_ms: 1,
        min_content_bytes: 10,
        min_artifact_bytes: TEST_MIN_ARTIFACT_BYTES,
        color: false,
        ..Config::default()
    }
}

/// Mirror page announcing `version`
pub fn readme_with(version: &str) -> String {
    format!("# Cursor download links\n\n## Cursor {version}\n\n- Linux x64: AppImage\n")
}

/// ELF-looking payload of `len` bytes
pub fn elf_payload(len: usize) -> Vec<u8> {
    let mut payload = b"\x7fELF".to_vec();
    payload.resize(len, 0);
    payload
}

/// Sandboxed file layout rooted in a fresh temporary directory
pub struct Sandbox {
    pub root: TempDir,
    pub paths: Paths,
}

impl Sandbox {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let paths = Paths::sandboxed(root.path());
        Self { root, paths }
    }

    /// Create an installed artifact named `Cursor-<version>-x86_64.AppImage`
    pub fn install_existing(&self, version: &str) -> PathBuf {
        fs::create_dir_all(&self.paths.app_dir).unwrap();
        let path = self
            .paths
            .app_dir
            .join(format!("Cursor-{version}-x86_64.AppImage"));
        fs::write(&path, elf_payload(128)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub fn artifact(&self, version: &str) -> PathBuf {
        self.paths
            .app_dir
            .join(format!("Cursor-{version}-x86_64.AppImage"))
    }

    /// App using a real mirror source against `config` and the given host
    pub fn app(&self, config: Config, system: SandboxSystem) -> App {
        let (api_client, download_client) = http::clients(&config).unwrap();
        let source = MirrorSource::new(
            api_client,
            config.version_urls.clone(),
            RetryPolicy::fixed(config.fetch_retries, config.retry_delay()),
            config.min_content_bytes,
        );
        App::new(
            config,
            self.paths.clone(),
            Arch::X86_64,
            Box::new(system),
            Box::new(source),
            download_client,
        )
    }
}
