//! Integration tests for first-run setup on disk.

mod common;

use cs_core::constants::env_keys;
use cs_core::error::StackError;
use cs_models::EnvFile;
use cs_core::config::StackConfig;
use cs_services::setup::{init_config_file, init_env_file, write_identity_credentials};
use cs_services::SetupChecklist;

// ---- init ----

#[test]
fn init_writes_template_with_generated_password() {
    let (config, dir) = common::create_test_project();
    let path = init_env_file(&config, false).unwrap();
    assert_eq!(path, common::env_path(dir.path()));

    let env = EnvFile::load(&path).unwrap();
    let password = env.get(env_keys::POSTGRES_PASSWORD).unwrap();
    assert_eq!(password.len(), 24);
    assert!(env.get(env_keys::DATABASE_URL).unwrap().contains(password));
    assert!(!env.is_set(env_keys::IDP_CLIENT_ID));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let (config, dir) = common::create_test_project();
    let path = common::env_path(dir.path());
    std::fs::write(&path, "IDP_CLIENT_SECRET=keep-me\n").unwrap();

    let err = init_env_file(&config, false).unwrap_err();
    assert!(matches!(err, StackError::Config(_)), "{err}");
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "IDP_CLIENT_SECRET=keep-me\n");

    init_env_file(&config, true).unwrap();
    assert!(!EnvFile::load(&path).unwrap().is_set(env_keys::IDP_CLIENT_SECRET));
}

#[test]
fn init_writes_editable_config_once() {
    let (mut config, dir) = common::create_test_project();
    let path = dir.path().join("conf").join("config.toml");
    config.setup.bucket = "uploads".into();

    assert!(init_config_file(&config, &path, false).unwrap());
    assert_eq!(StackConfig::load_from_file(&path).unwrap().setup.bucket, "uploads");

    config.setup.bucket = "other".into();
    assert!(!init_config_file(&config, &path, false).unwrap());
    assert_eq!(StackConfig::load_from_file(&path).unwrap().setup.bucket, "uploads");

    assert!(init_config_file(&config, &path, true).unwrap());
    assert_eq!(StackConfig::load_from_file(&path).unwrap().setup.bucket, "other");
}

// ---- identity credentials ----

#[test]
fn identity_credentials_are_written_preserving_layout() {
    let (_config, dir) = common::create_test_project();
    let path = common::env_path(dir.path());
    std::fs::write(
        &path,
        "# keep this comment\nPOSTGRES_PASSWORD=pw\nIDP_CLIENT_ID=\n\n# trailing\n",
    )
    .unwrap();

    write_identity_credentials(&path, " abc123 ", "s3cr3t").unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("# keep this comment\nPOSTGRES_PASSWORD=pw\n"));
    assert!(contents.contains("# trailing"));

    let env = EnvFile::load(&path).unwrap();
    assert_eq!(env.get(env_keys::IDP_CLIENT_ID), Some("abc123"));
    assert_eq!(env.get(env_keys::IDP_CLIENT_SECRET), Some("s3cr3t"));
    assert_eq!(env.keys(), vec!["POSTGRES_PASSWORD", "IDP_CLIENT_ID", "IDP_CLIENT_SECRET"]);
}

#[test]
fn identity_credentials_require_both_values() {
    let (_config, dir) = common::create_test_project();
    let path = common::env_path(dir.path());

    assert!(write_identity_credentials(&path, "id", "  ").is_err());
    assert!(!path.exists());
}

// ---- checklist ----

#[test]
fn checklist_completes_after_identity_setup() {
    let (config, dir) = common::create_initialized_project();
    let path = common::env_path(dir.path());

    let env = EnvFile::load(&path).unwrap();
    assert!(!SetupChecklist::evaluate(&config, Some(&env)).complete());

    write_identity_credentials(&path, "id", "secret").unwrap();
    let env = EnvFile::load(&path).unwrap();
    assert!(SetupChecklist::evaluate(&config, Some(&env)).complete());
}
