//! Process-level configuration loading (file plus environment)

use std::fs;

use serial_test::serial;
use tempfile::TempDir;

use cursor_installer::config::{Config, DEFAULT_FETCH_RETRIES};

const KEYS: &[&str] = &[
    "CURSOR_INSTALLER_CONFIG",
    "CURSOR_INSTALLER_FETCH_RETRIES",
    "CURSOR_INSTALLER_DEBUG",
];

fn clear_env() {
    for key in KEYS {
        // SAFETY: tests touching the environment run serially
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
#[serial]
fn load_reads_file_named_by_env_and_applies_overrides() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(
        &path,
        r#"{"versionUrls": ["http://localhost/README.md"], "fetchRetries": 7}"#,
    )
    .unwrap();

    // SAFETY: serialized with the other environment tests
    unsafe {
        std::env::set_var("CURSOR_INSTALLER_CONFIG", &path);
        std::env::set_var("CURSOR_INSTALLER_DEBUG", "1");
    }

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.version_urls, vec!["http://localhost/README.md"]);
    assert_eq!(config.fetch_retries, 7);
    assert!(config.debug);
}

#[test]
#[serial]
fn environment_wins_over_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"fetchRetries": 7}"#).unwrap();

    // SAFETY: serialized with the other environment tests
    unsafe {
        std::env::set_var("CURSOR_INSTALLER_CONFIG", &path);
        std::env::set_var("CURSOR_INSTALLER_FETCH_RETRIES", "9");
    }

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.fetch_retries, 9);
}

#[test]
#[serial]
fn missing_config_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();

    // SAFETY: serialized with the other environment tests
    unsafe { std::env::set_var("CURSOR_INSTALLER_CONFIG", dir.path().join("absent.json")) };

    let config = Config::load().unwrap();
    clear_env();

    assert_eq!(config.fetch_retries, DEFAULT_FETCH_RETRIES);
}
