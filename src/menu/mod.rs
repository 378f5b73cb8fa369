//! Interactive numbered menu over stdin/stdout
//!
//! A single main-menu state: every valid choice runs one operation and
//! returns to the menu. The loop ends on the exit choice, end of input or an
//! input timeout.

pub mod output;

use std::io::Write;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::app::{App, ExitStatus, Outcome};
use crate::prompt::{Confirm, parse_answer};

#[derive(Debug, Error)]
pub enum MenuError {
    #[error("No input within {0:?}")]
    Timeout(Duration),

    #[error("End of input")]
    Eof,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Main menu entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    CheckInstall,
    ShortcutsOnly,
    ShowInfo,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(MenuChoice::CheckInstall),
            "2" => Some(MenuChoice::ShortcutsOnly),
            "3" => Some(MenuChoice::ShowInfo),
            "4" | "0" => Some(MenuChoice::Exit),
            _ => None,
        }
    }
}

const MENU_TEXT: &str = "\
  1) Check for updates / install
  2) Recreate shortcuts only
  3) Show installation info
  4) Exit";

/// Menu bound to an input and an output stream
pub struct Menu<R, W> {
    input: R,
    output: W,
    input_timeout: Duration,
}

impl<R, W> Menu<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W, input_timeout: Duration) -> Self {
        Self {
            input,
            output,
            input_timeout,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    async fn read_line(&mut self) -> Result<String, MenuError> {
        self.say(|o| o.flush());
        let mut line = String::new();
        match timeout(self.input_timeout, self.input.read_line(&mut line)).await {
            Err(_) => Err(MenuError::Timeout(self.input_timeout)),
            Ok(Ok(0)) => Err(MenuError::Eof),
            Ok(Ok(_)) => Ok(line.trim().to_string()),
            Ok(Err(e)) => Err(MenuError::Io(e)),
        }
    }

    fn say(&mut self, f: impl FnOnce(&mut W) -> std::io::Result<()>) {
        if let Err(e) = f(&mut self.output) {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    /// Loop until the operator exits or input stops
    pub async fn run(&mut self, app: &App) -> ExitStatus {
        self.say(|o| output::heading(o, "Cursor AppImage installer"));

        loop {
            self.say(|o| writeln!(o, "\n{MENU_TEXT}"));
            self.say(|o| write!(o, "Choose an option: "));

            let line = match self.read_line().await {
                Ok(line) => line,
                Err(e) => {
                    info!("Leaving menu: {}", e);
                    self.say(|o| writeln!(o));
                    self.say(|o| output::warning(o, &e.to_string()));
                    return ExitStatus::Cancelled;
                }
            };

            let Some(choice) = MenuChoice::parse(&line) else {
                warn!("Invalid menu input: {:?}", line);
                self.say(|o| output::error(o, &format!("Invalid choice: {line:?}")));
                continue;
            };
            debug!("Menu choice: {:?}", choice);

            match choice {
                MenuChoice::CheckInstall => self.check_install(app).await,
                MenuChoice::ShortcutsOnly => self.shortcuts(app).await,
                MenuChoice::ShowInfo => self.show_info(app).await,
                MenuChoice::Exit => {
                    self.say(|o| output::info(o, "Bye"));
                    return ExitStatus::Success;
                }
            }
        }
    }

    async fn check_install(&mut self, app: &App) {
        self.say(|o| output::info(o, "Checking for the latest version..."));

        match app.check_and_install(self).await {
            Outcome::Installed { version, report } => {
                self.say(|o| {
                    output::success(
                        o,
                        &format!("Cursor {version} installed at {}", report.artifact.display()),
                    )
                });
                if let Some(backup) = &report.backup {
                    self.say(|o| output::info(o, &format!("Backup: {}", backup.display())));
                }
                for removed in &report.removed {
                    self.say(|o| output::info(o, &format!("Removed {}", removed.display())));
                }
                if !report.apparmor_loaded {
                    self.say(|o| output::warning(o, "AppArmor profile was not loaded"));
                }
            }
            Outcome::UpToDate { version } => {
                self.say(|o| output::success(o, &format!("Cursor {version} is up to date")));
            }
            Outcome::Declined => self.say(|o| output::warning(o, "Cancelled")),
            Outcome::Failed(reason) => self.say(|o| output::error(o, &reason)),
        }
    }

    async fn shortcuts(&mut self, app: &App) {
        match app.repair_shortcuts().await {
            Ok(artifact) => self.say(|o| {
                output::success(
                    o,
                    &format!("Shortcuts recreated for {}", artifact.path.display()),
                )
            }),
            Err(e) => self.say(|o| output::error(o, &e.to_string())),
        }
    }

    async fn show_info(&mut self, app: &App) {
        let info = match app.info().await {
            Ok(info) => info,
            Err(e) => {
                self.say(|o| output::error(o, &e.to_string()));
                return;
            }
        };

        let installed = info.installed.as_ref().map_or_else(
            || "not installed".to_string(),
            |a| {
                let version = a
                    .version
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                format!("{version} ({})", a.path.display())
            },
        );
        let latest = match &info.latest {
            Ok(version) => version.to_string(),
            Err(e) => format!("unavailable ({e})"),
        };

        self.say(|o| output::heading(o, "Installation"));
        self.say(|o| output::field(o, "Installed", &installed));
        self.say(|o| output::field(o, "Latest", &latest));
        self.say(|o| output::field(o, "Architecture", info.arch.as_str()));
        if let Some(os) = &info.os {
            self.say(|o| output::field(o, "System", &os.pretty_name));
        }
        self.say(|o| output::field(o, "App directory", &info.paths.app_dir.to_string_lossy()));
        self.say(|o| output::field(o, "Launcher", &info.paths.bin_link.to_string_lossy()));
        self.say(|o| {
            output::field(
                o,
                "Desktop entry",
                &info.paths.desktop_user.to_string_lossy(),
            )
        });
        self.say(|o| {
            output::field(
                o,
                "AppArmor",
                &info.paths.apparmor_profile.to_string_lossy(),
            )
        });
    }
}

#[async_trait::async_trait]
impl<R, W> Confirm for Menu<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn confirm(&mut self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        self.say(|o| write!(o, "{question} {hint} "));

        match self.read_line().await {
            Ok(answer) => parse_answer(&answer, default).unwrap_or_else(|| {
                warn!("Unrecognized answer {:?}; treating as no", answer);
                false
            }),
            Err(e) => {
                info!("No answer to {:?}: {}", question, e);
                false
            }
        }
    }
}
