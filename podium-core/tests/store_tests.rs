//! Bootstrap, update, and error-surface tests for the user config store.
//! Storage: $APP_DATA_DIRECTORY/userConfig.json

use assert_fs::prelude::*;
use podium_core::{env, store, ApiKey, ConfigError, Provider, UserConfig};
use predicates::prelude::predicate;
use rstest::rstest;
use std::collections::HashMap;
use std::fs;

fn overlay(pairs: &[(&str, &str)]) -> UserConfig {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env::credentials_from_lookup(|k| vars.get(k).cloned()).expect("overlay")
}

fn key(cfg: &Option<ApiKey>) -> Option<&str> {
    cfg.as_ref().map(ApiKey::expose)
}

// ---------------------------------------------------------------------------
// 1. Bootstrap
// ---------------------------------------------------------------------------

#[test]
fn bootstrap_creates_missing_directories_and_file() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let path = root.path().join("nested").join("data").join("userConfig.json");

    let merged = store::bootstrap(&path, overlay(&[("LLM", "openai"), ("OPENAI_API_KEY", "sk-1")]))
        .expect("bootstrap");

    assert_eq!(merged.llm, Some(Provider::OpenAi));
    root.child("nested/data/userConfig.json")
        .assert(predicate::str::contains(r#""OPENAI_API_KEY":"sk-1""#));
}

#[test]
fn bootstrap_with_empty_environment_writes_empty_object() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let path = root.path().join("userConfig.json");

    store::bootstrap(&path, UserConfig::default()).expect("bootstrap");

    root.child("userConfig.json").assert("{}");
}

#[test]
fn bootstrap_with_empty_environment_preserves_persisted_record() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("userConfig.json");
    file.write_str(r#"{"LLM":"google","OPENAI_API_KEY":"sk-old","GOOGLE_API_KEY":"g-old"}"#)
        .expect("seed");

    let before = store::load(file.path()).expect("load");
    let merged = store::bootstrap(file.path(), UserConfig::default()).expect("bootstrap");

    assert_eq!(merged, before);
    assert_eq!(store::load(file.path()).expect("reload"), before);
}

#[test]
fn environment_overrides_persisted_values_field_by_field() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("userConfig.json");
    file.write_str(r#"{"LLM":"google","OPENAI_API_KEY":"sk-old","GOOGLE_API_KEY":"g-old"}"#)
        .expect("seed");

    let merged = store::bootstrap(
        file.path(),
        overlay(&[("LLM", "openai"), ("OPENAI_API_KEY", "sk-new"), ("GOOGLE_API_KEY", "")]),
    )
    .expect("bootstrap");

    assert_eq!(merged.llm, Some(Provider::OpenAi));
    assert_eq!(key(&merged.openai_api_key), Some("sk-new"));
    assert_eq!(key(&merged.google_api_key), Some("g-old"), "empty env must not clear");
}

#[test]
fn bootstrap_fails_with_write_error_when_parent_is_a_file() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("blocker").write_str("not a directory").expect("seed");
    let path = root.path().join("blocker").join("userConfig.json");

    let err = store::bootstrap(&path, UserConfig::default()).unwrap_err();

    assert!(matches!(err, ConfigError::Write { .. }), "got: {err}");
    assert!(err.to_string().contains("failed to write user config"));
}

#[test]
fn corrupt_file_is_a_parse_error_with_path() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let file = root.child("userConfig.json");
    file.write_str("{ not json").expect("seed");

    let err = store::bootstrap(file.path(), UserConfig::default()).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("userConfig.json"));
    // The broken file is left untouched for the operator to inspect.
    assert_eq!(fs::read_to_string(file.path()).expect("read"), "{ not json");
}

// ---------------------------------------------------------------------------
// 2. Update (settings save)
// ---------------------------------------------------------------------------

#[test]
fn update_merges_incoming_over_persisted() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let path = root.path().join("userConfig.json");
    store::bootstrap(&path, overlay(&[("LLM", "openai"), ("OPENAI_API_KEY", "sk-1")]))
        .expect("bootstrap");

    let incoming = UserConfig {
        llm: Some(Provider::Google),
        openai_api_key: None,
        google_api_key: ApiKey::new("g-1"),
    };
    let merged = store::update(&path, incoming, true).expect("update");

    assert_eq!(merged.llm, Some(Provider::Google));
    assert_eq!(key(&merged.openai_api_key), Some("sk-1"));
    assert_eq!(key(&merged.google_api_key), Some("g-1"));
    assert_eq!(store::load(&path).expect("reload"), merged);
}

#[test]
fn update_is_refused_when_keys_are_locked() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let path = root.path().join("userConfig.json");

    let err = store::update(&path, UserConfig::default(), false).unwrap_err();

    assert!(matches!(err, ConfigError::KeysLocked));
    assert!(!path.exists(), "a refused update must not create the file");
}

// ---------------------------------------------------------------------------
// 3. Provider parsing
// ---------------------------------------------------------------------------

#[rstest]
#[case("openai", Provider::OpenAi)]
#[case("OpenAI", Provider::OpenAi)]
#[case(" google ", Provider::Google)]
#[case("GOOGLE", Provider::Google)]
fn provider_parses_case_insensitively(#[case] raw: &str, #[case] expected: Provider) {
    assert_eq!(raw.parse::<Provider>().expect("parse"), expected);
}

#[rstest]
#[case("")]
#[case("ollama")]
#[case("open ai")]
fn provider_rejects_unknown_values(#[case] raw: &str) {
    assert!(matches!(
        raw.parse::<Provider>(),
        Err(ConfigError::UnknownProvider(_))
    ));
}
