use std::net::TcpListener;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn podium_cmd(data: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("podium"));
    cmd.env("APP_DATA_DIRECTORY", data)
        .env_remove("USER_CONFIG_PATH")
        .env_remove("LLM")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GOOGLE_API_KEY");
    cmd
}

/// A local port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    port
}

#[test]
fn wait_times_out_on_closed_port() {
    let data = TempDir::new().expect("data");
    let url = format!("http://127.0.0.1:{}/", closed_port());

    podium_cmd(data.path())
        .args(["wait", &url, "--interval-secs", "1", "--timeout-secs", "2"])
        .assert()
        .failure()
        .stderr(contains("never became ready"));
}

#[test]
fn start_fails_fast_without_service_directories() {
    let data = TempDir::new().expect("data");
    let root = TempDir::new().expect("root");

    podium_cmd(data.path())
        .args(["start", "--root"])
        .arg(root.path())
        .assert()
        .failure()
        .stderr(contains("backend directory not found"));

    assert!(!data.path().join("userConfig.json").exists());
}

#[test]
fn serve_static_rejects_missing_directory() {
    let data = TempDir::new().expect("data");
    let missing = data.path().join("missing");

    podium_cmd(data.path())
        .args(["serve-static", "--port", "0", "--dir"])
        .arg(&missing)
        .assert()
        .failure()
        .stderr(contains("static directory not found"));
}
