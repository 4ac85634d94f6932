//! Configuration management for madabank-net
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Precedence, lowest to highest: built-in defaults, the YAML file,
//! `MADABANK_*` environment variables, CLI flags.

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Base URL used by the production environment
pub const PRODUCTION_BASE_URL: &str = "https://api.madabank.art";

/// Base URL used by the development and test environments
pub const MOCK_BASE_URL: &str = "https://mock.madabank.art";

/// Upper bound accepted for `auth.max_auth_retries`
pub const MAX_AUTH_RETRIES_LIMIT: u32 = 5;

/// Main configuration structure for madabank-net
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Deployment environment; selects the default base URL
    #[serde(default)]
    pub environment: Environment,

    /// API endpoint settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Token refresh settings
    #[serde(default)]
    pub auth: AuthConfig,

    /// Credential storage settings
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Prod,
    Dev,
    Test,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Prod => PRODUCTION_BASE_URL,
            Environment::Dev | Environment::Test => MOCK_BASE_URL,
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "prod" | "production" => Some(Environment::Prod),
            "dev" | "development" => Some(Environment::Dev),
            "test" => Some(Environment::Test),
            _ => None,
        }
    }
}

/// API endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Explicit base URL; overrides the environment's default
    #[serde(default)]
    pub base_url: Option<String>,

    /// Timeout applied to every HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Token refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Refresh endpoint; defaults to `<base_url>/auth/refresh`
    #[serde(default)]
    pub refresh_url: Option<String>,

    /// Timeout for a single refresh call
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_seconds: u64,

    /// Refresh-and-retry rounds allowed per request
    #[serde(default = "default_max_auth_retries")]
    pub max_auth_retries: u32,
}

fn default_refresh_timeout() -> u64 {
    15
}

fn default_max_auth_retries() -> u32 {
    1
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_url: None,
            refresh_timeout_seconds: default_refresh_timeout(),
            max_auth_retries: default_max_auth_retries(),
        }
    }
}

/// Where the token pair is kept
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// Process memory only; lost on exit
    Memory,
    /// OS keyring
    #[default]
    Keyring,
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,

    /// Keyring service name
    #[serde(default = "default_service")]
    pub service: String,

    /// Keyring account name
    #[serde(default = "default_account")]
    pub account: String,
}

fn default_service() -> String {
    "madabank-net".to_string()
}

fn default_account() -> String {
    "default".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            service: default_service(),
            account: default_account(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ApiError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ApiError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(env) = std::env::var("MADABANK_ENV") {
            match Environment::parse(&env) {
                Some(value) => self.environment = value,
                None => tracing::warn!("Invalid MADABANK_ENV: {}", env),
            }
        }

        if let Ok(base_url) = std::env::var("MADABANK_BASE_URL") {
            self.api.base_url = Some(base_url);
        }

        if let Ok(refresh_url) = std::env::var("MADABANK_REFRESH_URL") {
            self.auth.refresh_url = Some(refresh_url);
        }

        if let Ok(timeout) = std::env::var("MADABANK_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.api.request_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MADABANK_REQUEST_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(timeout) = std::env::var("MADABANK_REFRESH_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.auth.refresh_timeout_seconds = value;
            } else {
                tracing::warn!("Invalid MADABANK_REFRESH_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(retries) = std::env::var("MADABANK_MAX_AUTH_RETRIES") {
            if let Ok(value) = retries.parse() {
                self.auth.max_auth_retries = value;
            } else {
                tracing::warn!("Invalid MADABANK_MAX_AUTH_RETRIES: {}", retries);
            }
        }

        if let Ok(backend) = std::env::var("MADABANK_CREDENTIAL_BACKEND") {
            self.credentials.backend = match backend.to_lowercase().as_str() {
                "memory" => CredentialBackend::Memory,
                "keyring" => CredentialBackend::Keyring,
                _ => {
                    tracing::warn!("Invalid MADABANK_CREDENTIAL_BACKEND: {}", backend);
                    self.credentials.backend
                }
            };
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(base_url) = &cli.base_url {
            tracing::debug!("Using base URL override from CLI: {}", base_url);
            self.api.base_url = Some(base_url.clone());
        }
    }

    /// The effective API base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the configured URL does not parse.
    pub fn base_url(&self) -> Result<Url> {
        let raw = self
            .api
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.base_url());
        parse_url("api.base_url", raw)
    }

    /// The effective refresh endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the configured URL does not parse.
    pub fn refresh_url(&self) -> Result<Url> {
        match &self.auth.refresh_url {
            Some(raw) => parse_url("auth.refresh_url", raw),
            None => {
                let base = self.base_url()?;
                let joined = format!("{}/auth/refresh", base.as_str().trim_end_matches('/'));
                parse_url("auth.refresh_url", &joined)
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_seconds)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.auth.refresh_timeout_seconds)
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.request_timeout_seconds == 0 {
            return Err(ApiError::Config(
                "request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.auth.refresh_timeout_seconds == 0 {
            return Err(ApiError::Config(
                "refresh_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.auth.max_auth_retries > MAX_AUTH_RETRIES_LIMIT {
            return Err(ApiError::Config(format!(
                "max_auth_retries must be less than or equal to {}",
                MAX_AUTH_RETRIES_LIMIT
            ))
            .into());
        }

        self.base_url()?;
        self.refresh_url()?;

        if self.credentials.backend == CredentialBackend::Keyring {
            if self.credentials.service.trim().is_empty() {
                return Err(
                    ApiError::Config("credentials.service cannot be empty".to_string()).into(),
                );
            }
            if self.credentials.account.trim().is_empty() {
                return Err(
                    ApiError::Config("credentials.account cannot be empty".to_string()).into(),
                );
            }
        }

        Ok(())
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| ApiError::Config(format!("Invalid {}: {} ({})", field, raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::Config(format!(
            "Invalid {}: {} (scheme must be http or https)",
            field, raw
        ))
        .into());
    }
    Ok(url)
}
