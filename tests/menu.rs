//! Menu loop tests driven through in-memory input

mod helper;

use std::time::Duration;

use helper::{Sandbox, SandboxSystem, readme_with, test_config};

use cursor_installer::app::ExitStatus;
use cursor_installer::environment::check_os;
use cursor_installer::menu::Menu;

async fn run_menu(input: &'static [u8], server_url: &str, sandbox: &Sandbox) -> (ExitStatus, String) {
    let (system, _state) = SandboxSystem::new(&[]);
    let app = sandbox.app(test_config(server_url), system);
    let mut menu = Menu::new(input, Vec::new(), Duration::from_secs(5));
    let status = menu.run(&app).await;
    (status, String::from_utf8(menu.into_output()).unwrap())
}

#[tokio::test]
async fn exit_choice_ends_with_success() {
    let server = mockito::Server::new_async().await;
    let sandbox = Sandbox::new();

    let (status, output) = run_menu(b"4\n", &server.url(), &sandbox).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(output.contains("1) Check for updates / install"));
}

#[tokio::test]
async fn invalid_choice_reprompts() {
    let server = mockito::Server::new_async().await;
    let sandbox = Sandbox::new();

    let (status, output) = run_menu(b"9\nhello\n0\n", &server.url(), &sandbox).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(output.contains("Invalid choice: \"9\""));
    assert!(output.contains("Invalid choice: \"hello\""));
    assert_eq!(output.matches("Choose an option: ").count(), 3);
}

#[tokio::test]
async fn end_of_input_cancels() {
    let server = mockito::Server::new_async().await;
    let sandbox = Sandbox::new();

    let (status, output) = run_menu(b"", &server.url(), &sandbox).await;

    assert_eq!(status, ExitStatus::Cancelled);
    assert!(output.contains("End of input"));
}

#[tokio::test]
async fn info_shows_installed_and_latest_versions() {
    let mut server = mockito::Server::new_async().await;
    let _readme = server
        .mock("GET", "/README.md")
        .with_status(200)
        .with_body(readme_with("1.5.6"))
        .create_async()
        .await;
    let sandbox = Sandbox::new();
    let artifact = sandbox.install_existing("1.5.5");

    let (status, output) = run_menu(b"3\n4\n", &server.url(), &sandbox).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(output.contains(&format!("1.5.5 ({})", artifact.display())));
    assert!(output.contains("1.5.6"));
    assert!(output.contains("x86_64"));
}

#[tokio::test]
async fn info_shows_detected_system() {
    let mut server = mockito::Server::new_async().await;
    let _readme = server
        .mock("GET", "/README.md")
        .with_status(200)
        .with_body(readme_with("1.5.6"))
        .create_async()
        .await;
    let sandbox = Sandbox::new();
    let (system, _state) = SandboxSystem::new(&[]);
    let os = check_os("ID=ubuntu\nPRETTY_NAME=\"Ubuntu 24.04 LTS\"").unwrap();
    let app = sandbox.app(test_config(&server.url()), system).with_os(os);
    let input: &[u8] = b"3\n4\n";
    let mut menu = Menu::new(input, Vec::new(), Duration::from_secs(5));

    let status = menu.run(&app).await;

    assert_eq!(status, ExitStatus::Success);
    let output = String::from_utf8(menu.into_output()).unwrap();
    assert!(output.contains("Ubuntu 24.04 LTS"));
}

#[tokio::test]
async fn shortcuts_without_install_reports_error_and_continues() {
    let server = mockito::Server::new_async().await;
    let sandbox = Sandbox::new();

    let (status, output) = run_menu(b"2\n4\n", &server.url(), &sandbox).await;

    assert_eq!(status, ExitStatus::Success);
    assert!(output.contains("No installed artifact found"));
    assert!(!sandbox.paths.desktop_user.exists());
}
