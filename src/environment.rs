//! Host environment: real user home, localized directories, architecture and OS

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

const PASSWD_PATH: &str = "/etc/passwd";
const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Distributions accepted by `check_os` (matched against `ID` and `ID_LIKE`)
const SUPPORTED_OS_IDS: &[&str] = &["ubuntu", "debian"];

/// Tools without which nothing can be installed
pub const REQUIRED_TOOLS: &[&str] = &["sudo"];

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Unsupported operating system: {0}")]
    UnsupportedOs(String),

    #[error("Unsupported architecture: {0}")]
    UnsupportedArch(String),

    #[error("Cannot determine home directory")]
    NoHome,

    #[error("Required tool not found in PATH: {}", .0.join(", "))]
    MissingTools(Vec<String>),
}

/// CPU architecture of the published AppImages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    pub fn current() -> Result<Self, EnvironmentError> {
        Self::from_rust_arch(std::env::consts::ARCH)
    }

    pub fn from_rust_arch(arch: &str) -> Result<Self, EnvironmentError> {
        match arch {
            "x86_64" => Ok(Arch::X86_64),
            "aarch64" => Ok(Arch::Aarch64),
            other => Err(EnvironmentError::UnsupportedArch(other.to_string())),
        }
    }

    /// Returns the architecture string used in artifact names
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }
}

/// Every location the installer reads or writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Per-user directory holding the AppImage, wrapper, backup and journal
    pub app_dir: PathBuf,
    pub download_dir: PathBuf,
    pub desktop_user: PathBuf,
    pub desktop_system: PathBuf,
    pub icon: PathBuf,
    pub wrapper: PathBuf,
    pub bin_link: PathBuf,
    pub apparmor_profile: PathBuf,
    pub journal: PathBuf,
}

impl Paths {
    /// Standard layout for a user whose home is `home`
    pub fn for_home(home: &Path, download_dir: PathBuf) -> Self {
        let app_dir = home.join("Applications/cursor");
        Self {
            download_dir,
            desktop_user: home.join(".local/share/applications/cursor.desktop"),
            desktop_system: PathBuf::from("/usr/share/applications/cursor.desktop"),
            icon: home.join(".local/share/icons/cursor.png"),
            wrapper: app_dir.join("cursor.sh"),
            bin_link: PathBuf::from("/usr/local/bin/cursor"),
            apparmor_profile: PathBuf::from("/etc/apparmor.d/cursor-appimage"),
            journal: app_dir.join(".install-state.json"),
            app_dir,
        }
    }

    /// Layout with every path, system ones included, rooted under `root`
    pub fn sandboxed(root: &Path) -> Self {
        let home = root.join("home/user");
        let mut paths = Self::for_home(&home, home.join("Downloads"));
        paths.desktop_system = root.join("usr/share/applications/cursor.desktop");
        paths.bin_link = root.join("usr/local/bin/cursor");
        paths.apparmor_profile = root.join("etc/apparmor.d/cursor-appimage");
        paths
    }
}

/// Operating system identity read from os-release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsInfo {
    pub id: String,
    pub pretty_name: String,
}

/// Resolved host environment
#[derive(Debug, Clone)]
pub struct Environment {
    pub paths: Paths,
    pub arch: Arch,
    pub os: OsInfo,
}

impl Environment {
    /// Inspect the running host
    pub fn detect() -> Result<Self, EnvironmentError> {
        let os_release = std::fs::read_to_string(OS_RELEASE_PATH).unwrap_or_default();
        let os = check_os(&os_release)?;
        let arch = Arch::current()?;

        let sudo_user = std::env::var("SUDO_USER").ok().filter(|u| u != "root");
        let passwd = std::fs::read_to_string(PASSWD_PATH).unwrap_or_default();
        let home = real_home(
            sudo_user.as_deref(),
            std::env::var("HOME").ok(),
            &passwd,
        )
        .or_else(dirs::home_dir)
        .ok_or(EnvironmentError::NoHome)?;

        let user_dirs = std::fs::read_to_string(home.join(".config/user-dirs.dirs")).ok();
        let download_dir = download_dir(&home, user_dirs.as_deref());

        info!(
            "Environment: os={} arch={} home={:?}",
            os.id,
            arch.as_str(),
            home
        );

        Ok(Self {
            paths: Paths::for_home(&home, download_dir),
            arch,
            os,
        })
    }
}

/// Home directory of the real user, looking through sudo
pub fn real_home(
    sudo_user: Option<&str>,
    home_env: Option<String>,
    passwd: &str,
) -> Option<PathBuf> {
    if let Some(user) = sudo_user {
        if let Some(home) = home_from_passwd(passwd, user) {
            debug!("Resolved home for sudo user {}: {:?}", user, home);
            return Some(home);
        }
    }
    home_env.filter(|h| !h.is_empty()).map(PathBuf::from)
}

/// Home directory field of `user`'s passwd entry
pub fn home_from_passwd(passwd: &str, user: &str) -> Option<PathBuf> {
    passwd
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split(':').collect::<Vec<_>>())
        .find(|fields| fields.len() >= 7 && fields[0] == user)
        .map(|fields| PathBuf::from(fields[5]))
        .filter(|home| !home.as_os_str().is_empty())
}

/// Localized download directory from `user-dirs.dirs`, or `~/Downloads`
pub fn download_dir(home: &Path, user_dirs: Option<&str>) -> PathBuf {
    user_dirs
        .and_then(|content| {
            content.lines().find_map(|line| {
                let value = line.trim().strip_prefix("XDG_DOWNLOAD_DIR=")?;
                let value = value.trim().trim_matches('"');
                if let Some(rest) = value.strip_prefix("$HOME") {
                    let rest = rest.trim_start_matches('/');
                    Some(if rest.is_empty() {
                        home.to_path_buf()
                    } else {
                        home.join(rest)
                    })
                } else if value.starts_with('/') {
                    Some(PathBuf::from(value))
                } else {
                    None
                }
            })
        })
        .unwrap_or_else(|| home.join("Downloads"))
}

/// Parse os-release and accept Ubuntu-family systems only
pub fn check_os(os_release: &str) -> Result<OsInfo, EnvironmentError> {
    let field = |key: &str| {
        os_release.lines().find_map(|line| {
            line.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
                .map(|v| v.trim().trim_matches('"').to_string())
        })
    };

    let id = field("ID").unwrap_or_default();
    let id_like = field("ID_LIKE").unwrap_or_default();
    let pretty_name = field("PRETTY_NAME").unwrap_or_else(|| id.clone());

    let supported = std::iter::once(id.as_str())
        .chain(id_like.split_whitespace())
        .any(|candidate| SUPPORTED_OS_IDS.contains(&candidate));

    if supported {
        Ok(OsInfo { id, pretty_name })
    } else if id.is_empty() {
        Err(EnvironmentError::UnsupportedOs("unknown".to_string()))
    } else {
        Err(EnvironmentError::UnsupportedOs(pretty_name))
    }
}

/// Fail when any of `tools` is missing from PATH
pub fn check_required_tools(tools: &[&str]) -> Result<(), EnvironmentError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|tool| which::which(tool).is_err())
        .map(|tool| tool.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EnvironmentError::MissingTools(missing))
    }
}
