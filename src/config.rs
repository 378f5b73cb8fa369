use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default time to wait for a menu answer (5 minutes)
pub const DEFAULT_INPUT_TIMEOUT_SECS: u64 = 300;

/// Default total timeout for a version-page or icon request (60 seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Default time allowed to establish a download connection
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default time a download may go without receiving data
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Default delay between attempts against the same mirror
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 2;

/// Default delay before the first busy-file re-check, doubled on every attempt
pub const DEFAULT_BUSY_DELAY_MS: u64 = 500;

/// Ping timeout used by the connectivity probe
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 3;

// =============================================================================
// Remote sources
// =============================================================================

/// Mirrors serving a page that mentions the latest release as `Cursor X.Y.Z`
pub const DEFAULT_VERSION_URLS: &[&str] = &[
    "https://raw.githubusercontent.com/oslook/cursor-ai-downloads/main/README.md",
    "https://cdn.jsdelivr.net/gh/oslook/cursor-ai-downloads@main/README.md",
    "https://fastly.jsdelivr.net/gh/oslook/cursor-ai-downloads@main/README.md",
];

/// Download URL template; `{version}` and `{arch}` are substituted
pub const DEFAULT_DOWNLOAD_URL: &str =
    "https://downloads.cursor.com/production/client/linux/{arch}/appimage/Cursor-{version}-{arch}.AppImage";

pub const DEFAULT_ICON_URL: &str =
    "https://raw.githubusercontent.com/getcursor/cursor/main/resources/linux/cursor.png";

pub const DEFAULT_PING_HOST: &str = "8.8.8.8";

// =============================================================================
// Thresholds
// =============================================================================

pub const DEFAULT_FETCH_RETRIES: u32 = 3;
pub const DEFAULT_BUSY_RETRIES: u32 = 5;

/// Version pages shorter than this are treated as a broken mirror response
pub const DEFAULT_MIN_CONTENT_BYTES: usize = 100;

/// AppImages smaller than this are treated as truncated downloads (10 MiB)
pub const DEFAULT_MIN_ARTIFACT_BYTES: u64 = 10 * 1024 * 1024;

pub const APP_NAME: &str = "cursor-installer";

/// Installer configuration
///
/// Loaded from an optional JSON file and then overridden by
/// `CURSOR_INSTALLER_*` environment variables.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub version_urls: Vec<String>,
    pub download_url: String,
    pub icon_url: String,
    pub ping_host: String,
    pub input_timeout_secs: u64,
    /// Total timeout for small requests; 0 disables it
    pub http_timeout_secs: u64,
    /// Download connection timeout; 0 disables it
    pub connect_timeout_secs: u64,
    /// Download stall timeout; 0 disables it
    pub read_timeout_secs: u64,
    pub fetch_retries: u32,
    pub retry_delay_secs: u64,
    pub busy_retries: u32,
    pub busy_delay_ms: u64,
    pub min_content_bytes: usize,
    pub min_artifact_bytes: u64,
    /// Reject downloads that do not start with the ELF magic
    pub verify_elf: bool,
    pub color: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version_urls: DEFAULT_VERSION_URLS.iter().map(|s| s.to_string()).collect(),
            download_url: DEFAULT_DOWNLOAD_URL.to_string(),
            icon_url: DEFAULT_ICON_URL.to_string(),
            ping_host: DEFAULT_PING_HOST.to_string(),
            input_timeout_secs: DEFAULT_INPUT_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            fetch_retries: DEFAULT_FETCH_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            busy_retries: DEFAULT_BUSY_RETRIES,
            busy_delay_ms: DEFAULT_BUSY_DELAY_MS,
            min_content_bytes: DEFAULT_MIN_CONTENT_BYTES,
            min_artifact_bytes: DEFAULT_MIN_ARTIFACT_BYTES,
            verify_elf: true,
            color: true,
            debug: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    /// Load the configuration for this process: config file (if any) plus
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CURSOR_INSTALLER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_path());

        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides. Unparseable values are ignored.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|v| v.trim().parse().ok())
        }

        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_INPUT_TIMEOUT")) {
            self.input_timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_HTTP_TIMEOUT")) {
            self.http_timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_CONNECT_TIMEOUT")) {
            self.connect_timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_READ_TIMEOUT")) {
            self.read_timeout_secs = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_FETCH_RETRIES")) {
            self.fetch_retries = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_RETRY_DELAY")) {
            self.retry_delay_secs = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_BUSY_RETRIES")) {
            self.busy_retries = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_BUSY_DELAY_MS")) {
            self.busy_delay_ms = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_MIN_SIZE")) {
            self.min_artifact_bytes = v;
        }
        if let Some(v) = parsed(lookup("CURSOR_INSTALLER_MIN_CONTENT")) {
            self.min_content_bytes = v;
        }
        if let Some(v) = lookup("CURSOR_INSTALLER_VERIFY_ELF").and_then(|v| parse_flag(&v)) {
            self.verify_elf = v;
        }
        if let Some(urls) = lookup("CURSOR_INSTALLER_VERSION_URLS") {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
            if !urls.is_empty() {
                self.version_urls = urls;
            }
        }
        if let Some(url) = lookup("CURSOR_INSTALLER_DOWNLOAD_URL").filter(|u| !u.is_empty()) {
            self.download_url = url;
        }
        if let Some(host) = lookup("CURSOR_INSTALLER_PING_HOST").filter(|h| !h.is_empty()) {
            self.ping_host = host;
        }
        if lookup("NO_COLOR").is_some() || lookup("CURSOR_INSTALLER_COLOR").as_deref() == Some("0")
        {
            self.color = false;
        }
        if lookup("CURSOR_INSTALLER_DEBUG").is_some_and(|v| v != "0" && !v.is_empty()) {
            self.debug = true;
        }
        self
    }

    /// `None` when input waits forever
    pub fn input_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.input_timeout_secs)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.http_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        non_zero_secs(self.read_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn busy_delay(&self) -> Duration {
        Duration::from_millis(self.busy_delay_ms)
    }
}

/// Timeout settings use 0 for "no timeout"
fn non_zero_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// `1/true/yes/on` or `0/false/no/off`
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Returns the path to the data directory for cursor-installer.
/// Uses $XDG_DATA_HOME/cursor-installer if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/cursor-installer,
/// or ./cursor-installer if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join(format!("{APP_NAME}.log"))
}

/// Returns the default config file path.
pub fn config_path() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir())
        .join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_NAME)
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}
