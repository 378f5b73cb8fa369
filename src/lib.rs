pub mod app;
pub mod config;
pub mod environment;
pub mod http;
pub mod install;
pub mod logging;
pub mod menu;
pub mod prompt;
pub mod retry;
pub mod version;
