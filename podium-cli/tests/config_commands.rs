use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn podium_cmd(data: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("podium"));
    cmd.env("APP_DATA_DIRECTORY", data)
        .env_remove("USER_CONFIG_PATH")
        .env_remove("LLM")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("CAN_CHANGE_KEYS")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn set_then_show_json_masks_keys() {
    let data = TempDir::new().expect("data");

    podium_cmd(data.path())
        .args(["config", "set", "--llm", "openai", "--openai-api-key", "sk-test-1234567890"])
        .assert()
        .success()
        .stdout(contains("updated"));

    let raw = fs::read_to_string(data.path().join("userConfig.json")).expect("config written");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["LLM"], "openai");
    assert_eq!(json["OPENAI_API_KEY"], "sk-test-1234567890");

    podium_cmd(data.path())
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(contains(r#""llm": "openai""#))
        .stdout(contains(r#""has_valid_credentials": true"#))
        .stdout(contains("sk-test-1234567890").not());

    podium_cmd(data.path())
        .args(["config", "show", "--json", "--reveal"])
        .assert()
        .success()
        .stdout(contains("sk-test-1234567890"));
}

#[test]
fn set_merges_over_existing_record() {
    let data = TempDir::new().expect("data");
    fs::write(
        data.path().join("userConfig.json"),
        r#"{"LLM":"google","GOOGLE_API_KEY":"g-key"}"#,
    )
    .expect("seed");

    podium_cmd(data.path())
        .args(["config", "set", "--openai-api-key", "sk-new"])
        .assert()
        .success();

    let raw = fs::read_to_string(data.path().join("userConfig.json")).expect("config");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(json["LLM"], "google");
    assert_eq!(json["GOOGLE_API_KEY"], "g-key");
    assert_eq!(json["OPENAI_API_KEY"], "sk-new");
}

#[test]
fn set_is_refused_when_keys_are_locked() {
    let data = TempDir::new().expect("data");

    podium_cmd(data.path())
        .env("CAN_CHANGE_KEYS", "false")
        .args(["config", "set", "--openai-api-key", "sk-blocked"])
        .assert()
        .failure()
        .stderr(contains("locked"));

    assert!(!data.path().join("userConfig.json").exists());
}

#[test]
fn set_without_values_fails() {
    let data = TempDir::new().expect("data");

    podium_cmd(data.path())
        .args(["config", "set"])
        .assert()
        .failure()
        .stderr(contains("nothing to update"));
}

#[test]
fn set_rejects_unknown_provider() {
    let data = TempDir::new().expect("data");

    podium_cmd(data.path())
        .args(["config", "set", "--llm", "anthropic"])
        .assert()
        .failure()
        .stderr(contains("unknown provider"));
}

#[test]
fn show_on_fresh_data_dir_reports_missing_credentials() {
    let data = TempDir::new().expect("data");

    podium_cmd(data.path())
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(contains(r#""has_valid_credentials": false"#))
        .stdout(contains(r#""can_change_keys": true"#));
}

#[test]
fn show_fails_on_corrupt_record() {
    let data = TempDir::new().expect("data");
    fs::write(data.path().join("userConfig.json"), "{not json").expect("seed");

    podium_cmd(data.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(contains("failed to load"));
}
