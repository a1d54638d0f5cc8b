use std::fs;

use medrag::{provision_key, Config, KeyOrigin, RagError};
use tempfile::tempdir;

fn config_with(var: &str, env_file: std::path::PathBuf) -> Config {
    Config {
        api_key_var: var.to_string(),
        env_file,
        ..Config::default()
    }
}

#[test]
fn entered_key_wins_over_env_file() {
    let dir = tempdir().expect("tempdir");
    let env_file = dir.path().join(".env");
    fs::write(&env_file, "MEDRAG_TEST_KEY_A=from-file\n").expect("write .env");
    let cfg = config_with("MEDRAG_TEST_KEY_A", env_file);

    let (credential, origin) = provision_key(&cfg, "typed-key").expect("entered key");
    assert_eq!(credential.expose(), "typed-key");
    assert_eq!(origin, KeyOrigin::Entered);
}

#[test]
fn empty_input_falls_back_to_env_file() {
    let dir = tempdir().expect("tempdir");
    let env_file = dir.path().join(".env");
    fs::write(&env_file, "OTHER=1\nMEDRAG_TEST_KEY_B=gsk_from_file\n").expect("write .env");
    let cfg = config_with("MEDRAG_TEST_KEY_B", env_file);

    let (credential, origin) = provision_key(&cfg, "").expect("env file key");
    assert_eq!(credential.expose(), "gsk_from_file");
    assert_eq!(origin, KeyOrigin::Environment);
}

#[test]
fn no_source_is_missing_credential() {
    let dir = tempdir().expect("tempdir");
    let cfg = config_with("MEDRAG_TEST_KEY_C", dir.path().join(".env"));

    let err = provision_key(&cfg, "").expect_err("no key anywhere");
    assert!(matches!(err, RagError::MissingCredential { ref var } if var == "MEDRAG_TEST_KEY_C"));
}

#[test]
fn empty_value_in_env_file_does_not_count() {
    let dir = tempdir().expect("tempdir");
    let env_file = dir.path().join(".env");
    fs::write(&env_file, "MEDRAG_TEST_KEY_D=\n").expect("write .env");
    let cfg = config_with("MEDRAG_TEST_KEY_D", env_file);

    assert!(provision_key(&cfg, "").is_err());
}

#[test]
fn credential_debug_is_redacted() {
    let dir = tempdir().expect("tempdir");
    let cfg = config_with("MEDRAG_TEST_KEY_E", dir.path().join(".env"));
    let (credential, _) = provision_key(&cfg, "gsk_secret").expect("entered key");
    assert!(!format!("{:?}", credential).contains("gsk_secret"));
}
