use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};

use cursor_installer::app::{App, ExitStatus};
use cursor_installer::config::{Config, log_path};
use cursor_installer::environment::{Environment, REQUIRED_TOOLS, check_required_tools};
use cursor_installer::install::system::HostSystem;
use cursor_installer::{http, logging};
use cursor_installer::menu::{Menu, output};
use cursor_installer::retry::RetryPolicy;
use cursor_installer::version::sources::MirrorSource;

#[derive(Parser)]
#[command(name = "cursor-installer")]
#[command(
    version,
    about = "Install and update the Cursor AppImage",
    long_about = "Interactive installer for the Cursor AppImage. Every setting is read \
                  from CURSOR_INSTALLER_* environment variables or the JSON config file."
)]
struct Cli {}

fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    if !config.color {
        colored::control::set_override(false);
    }

    let guard = logging::init(&config)?;
    info!("Starting {} (log: {:?})", env!("CARGO_PKG_VERSION"), log_path());

    let status = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(config));

    info!("Exiting with {:?}", status);
    drop(guard);
    std::process::exit(status.code());
}

async fn run(config: Config) -> ExitStatus {
    let mut stdout = std::io::stdout();

    let env = match Environment::detect().and_then(|env| {
        check_required_tools(REQUIRED_TOOLS)?;
        Ok(env)
    }) {
        Ok(env) => env,
        Err(e) => {
            error!("{}", e);
            let _ = output::error(&mut stdout, &e.to_string());
            return ExitStatus::Error;
        }
    };

    let (api_client, download_client) = match http::clients(&config) {
        Ok(clients) => clients,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            let _ = output::error(&mut stdout, &e.to_string());
            return ExitStatus::Error;
        }
    };

    let source = MirrorSource::new(
        api_client,
        config.version_urls.clone(),
        RetryPolicy::fixed(config.fetch_retries, config.retry_delay()),
        config.min_content_bytes,
    );

    let input_timeout = config.input_timeout().unwrap_or(Duration::MAX);

    let app = App::new(
        config,
        env.paths,
        env.arch,
        Box::new(HostSystem::new()),
        Box::new(source),
        download_client,
    )
    .with_os(env.os);

    Menu::new(BufReader::new(tokio::io::stdin()), stdout, input_timeout)
        .run(&app)
        .await
}
