//! HTTP clients
//!
//! Small GETs (mirror pages, icon) get a total request timeout. Artifact
//! downloads are large, so they only bound connection setup and the gap
//! between reads.

use std::time::Duration;

use reqwest::Client;

use crate::config::Config;

const USER_AGENT: &str = concat!("cursor-installer/", env!("CARGO_PKG_VERSION"));

/// Client for version pages; `None` disables the total timeout
pub fn api_client(timeout: Option<Duration>) -> reqwest::Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

/// Client for artifact downloads: no total timeout, a stalled transfer fails
/// after `read_timeout` without data
pub fn download_client(
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
) -> reqwest::Result<Client> {
    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    if let Some(timeout) = read_timeout {
        builder = builder.read_timeout(timeout);
    }
    builder.build()
}

/// Both clients configured from `config`
pub fn clients(config: &Config) -> reqwest::Result<(Client, Client)> {
    Ok((
        api_client(config.http_timeout())?,
        download_client(config.connect_timeout(), config.read_timeout())?,
    ))
}
