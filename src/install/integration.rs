//! Desktop integration: launcher entry, icon, wrapper script, symlink and AppArmor profile

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::environment::Paths;
use crate::install::error::InstallError;
use crate::install::system::SystemOps;
use crate::version::installed::ARTIFACT_GLOB;

/// Flag every launch path appends; the AppImage's Chromium sandbox cannot
/// start without a setuid helper
pub const LAUNCH_FLAG: &str = "--no-sandbox";

const PROFILE_NAME: &str = "cursor-appimage";

/// Quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escape a value for a desktop-entry `Exec` key
fn desktop_exec_quote(value: &str) -> String {
    let escaped = value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace('`', "\\`")
        .replace('$', "\\$");
    format!("\"{escaped}\"")
}

pub fn desktop_entry(artifact: &Path, icon: &Path) -> String {
    format!(
        "[Desktop Entry]\n\
         Name=Cursor\n\
         Comment=The AI Code Editor\n\
         Exec={} {} %F\n\
         Icon={}\n\
         Type=Application\n\
         Terminal=false\n\
         StartupWMClass=Cursor\n\
         Categories=Development;IDE;TextEditor;\n\
         MimeType=text/plain;inode/directory;\n",
        desktop_exec_quote(&artifact.to_string_lossy()),
        LAUNCH_FLAG,
        icon.display(),
    )
}

pub fn wrapper_script(artifact: &Path) -> String {
    format!(
        "#!/bin/sh\n# Launcher generated by cursor-installer\nexec {} \"$@\" {}\n",
        shell_quote(&artifact.to_string_lossy()),
        LAUNCH_FLAG,
    )
}

/// Profile granting user namespaces to every installed artifact
pub fn apparmor_profile(app_dir: &Path) -> String {
    let pattern = app_dir.join(ARTIFACT_GLOB);
    format!(
        "# Generated by cursor-installer\n\
         abi <abi/4.0>,\n\
         include <tunables/global>\n\
         \n\
         profile {PROFILE_NAME} \"{}\" flags=(unconfined) {{\n\
         \x20 userns,\n\
         \n\
         \x20 include if exists <local/{PROFILE_NAME}>\n\
         }}\n",
        pattern.display()
    )
}

fn write_user_file(path: &Path, contents: &str, mode: u32) -> Result<(), InstallError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(InstallError::io(parent))?;
    }
    fs::write(path, contents).map_err(InstallError::io(path))?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(InstallError::io(path))
}

/// Write the per-user launcher entry and its system-wide copy
pub fn install_desktop_entry(
    system: &dyn SystemOps,
    paths: &Paths,
    artifact: &Path,
) -> Result<(), InstallError> {
    let entry = desktop_entry(artifact, &paths.icon);

    write_user_file(&paths.desktop_user, &entry, 0o644)?;
    debug!("Wrote {:?}", paths.desktop_user);

    system.write_privileged(&paths.desktop_system, entry.as_bytes(), 0o644)?;
    info!(
        "Desktop entries written to {:?} and {:?}",
        paths.desktop_user, paths.desktop_system
    );
    Ok(())
}

/// Download the launcher icon unless one is already present.
///
/// Failures are logged and ignored; a missing icon does not break the launcher.
pub async fn fetch_icon(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    timeout: Option<Duration>,
) -> bool {
    if dest.exists() {
        debug!("Icon already present at {:?}", dest);
        return true;
    }

    let mut request = client.get(url);
    if let Some(timeout) = timeout {
        request = request.timeout(timeout);
    }
    let bytes = match request.send().await.and_then(|r| r.error_for_status()) {
        Ok(response) => response.bytes().await,
        Err(e) => Err(e),
    };

    let result = bytes.map_err(|e| e.to_string()).and_then(|bytes| {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(dest, &bytes).map_err(|e| e.to_string())
    });

    match result {
        Ok(()) => {
            info!("Icon saved to {:?}", dest);
            true
        }
        Err(e) => {
            warn!("Could not fetch icon from {}: {}", url, e);
            false
        }
    }
}

/// Write the wrapper script and link it into the executable search path
pub fn install_wrapper(
    system: &dyn SystemOps,
    paths: &Paths,
    artifact: &Path,
) -> Result<(), InstallError> {
    write_user_file(&paths.wrapper, &wrapper_script(artifact), 0o755)?;
    system.symlink_privileged(&paths.wrapper, &paths.bin_link)?;
    info!("Linked {:?} -> {:?}", paths.bin_link, paths.wrapper);
    Ok(())
}

/// Write and load the AppArmor profile.
///
/// Returns `false` when AppArmor tooling is absent and the step was skipped.
pub fn install_apparmor_profile(
    system: &dyn SystemOps,
    paths: &Paths,
) -> Result<bool, InstallError> {
    if !system.has_tool("apparmor_parser") {
        warn!("apparmor_parser not found; skipping AppArmor profile");
        return Ok(false);
    }

    let profile = apparmor_profile(&paths.app_dir);
    system.write_privileged(&paths.apparmor_profile, profile.as_bytes(), 0o644)?;
    system.reload_apparmor(&paths.apparmor_profile)?;
    info!("AppArmor profile loaded from {:?}", paths.apparmor_profile);
    Ok(true)
}
