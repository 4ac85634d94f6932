//! Configuration loading tests: YAML file, environment and CLI layering

mod common;

use serial_test::serial;

use madabank_net::cli::Cli;
use madabank_net::config::{Config, CredentialBackend, Environment};

const ENV_VARS: &[&str] = &[
    "MADABANK_ENV",
    "MADABANK_BASE_URL",
    "MADABANK_REFRESH_URL",
    "MADABANK_REQUEST_TIMEOUT_SECONDS",
    "MADABANK_REFRESH_TIMEOUT_SECONDS",
    "MADABANK_MAX_AUTH_RETRIES",
    "MADABANK_CREDENTIAL_BACKEND",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_load_full_config_file() {
    clear_env();
    let (_temp_dir, config_path) = common::temp_config_file(
        r#"
environment: dev
api:
  base_url: "http://localhost:8080/api"
  request_timeout_seconds: 12
auth:
  refresh_timeout_seconds: 4
  max_auth_retries: 2
credentials:
  backend: keyring
  service: madabank-test
  account: ada
"#,
    );

    let config = Config::load(config_path.to_str().unwrap(), &Cli::default()).unwrap();
    config.validate().unwrap();

    assert_eq!(config.environment, Environment::Dev);
    assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8080/api");
    assert_eq!(
        config.refresh_url().unwrap().as_str(),
        "http://localhost:8080/api/auth/refresh"
    );
    assert_eq!(config.request_timeout().as_secs(), 12);
    assert_eq!(config.refresh_timeout().as_secs(), 4);
    assert_eq!(config.auth.max_auth_retries, 2);
    assert_eq!(config.credentials.service, "madabank-test");
    assert_eq!(config.credentials.account, "ada");
}

#[test]
#[serial]
fn test_env_overrides_file() {
    clear_env();
    let (_temp_dir, config_path) =
        common::temp_config_file("environment: prod\ncredentials:\n  backend: keyring\n");
    std::env::set_var("MADABANK_ENV", "dev");
    std::env::set_var("MADABANK_CREDENTIAL_BACKEND", "memory");
    std::env::set_var("MADABANK_MAX_AUTH_RETRIES", "many");

    let config = Config::load(config_path.to_str().unwrap(), &Cli::default()).unwrap();
    clear_env();

    assert_eq!(config.environment, Environment::Dev);
    assert_eq!(config.credentials.backend, CredentialBackend::Memory);
    assert_eq!(config.auth.max_auth_retries, 1);
}

#[test]
#[serial]
fn test_invalid_refresh_url_fails_validation() {
    clear_env();
    let (_temp_dir, config_path) =
        common::temp_config_file("auth:\n  refresh_url: \"::not a url::\"\n");

    let config = Config::load(config_path.to_str().unwrap(), &Cli::default()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("auth.refresh_url"));
}

#[test]
#[serial]
fn test_empty_file_uses_defaults() {
    clear_env();
    let (_temp_dir, config_path) = common::temp_config_file("{}\n");

    let config = Config::load(config_path.to_str().unwrap(), &Cli::default()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.base_url().unwrap().as_str(), "https://api.madabank.art/");
    assert_eq!(config.credentials.backend, CredentialBackend::Keyring);
}
