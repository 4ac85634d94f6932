/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes two top-level command modules:

- `auth`    -- Login, logout, session status and forced refresh
- `request` -- Authenticated GET and POST calls

Each handler builds an [`ApiClient`] from the configuration, so every call
goes through the same bearer stamping and refresh coordination as library
callers.
*/

use crate::auth::session;
use crate::auth::Verdict;
use crate::client::ApiClient;
use crate::config::{Config, CredentialBackend};
use crate::endpoint::RawEndpoint;
use crate::error::{ApiError, Result};

// Session command handlers
pub mod auth {
    use super::*;

    /// Log in and store the issued token pair
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `email` - Account email
    /// * `password` - Account password
    pub async fn login(config: Config, email: String, password: String) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        tracing::info!("Logging in as {}", email);

        match session::login(&client, &email, &password).await {
            Ok(response) => {
                match response.expires_at {
                    Some(expires_at) => println!("Logged in. Access token expires at {}.", expires_at),
                    None => println!("Logged in."),
                }
                warn_if_ephemeral(&config);
                Ok(())
            }
            Err(e) => {
                eprintln!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// Remove stored credentials
    pub async fn logout(config: Config) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        session::logout(&**client.store())?;
        println!("Logged out.");
        Ok(())
    }

    /// Report whether credentials are stored, without printing them
    pub async fn status(config: Config) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        println!("{}", status_line(&config, client.store().get().is_some()));
        Ok(())
    }

    /// Force one coordinated refresh with the stored refresh token
    pub async fn refresh(config: Config) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        match client.coordinator().handle_auth_failure().await {
            Verdict::Retry => {
                println!("Token refreshed.");
                Ok(())
            }
            Verdict::DoNotRetry => {
                eprintln!("Token refresh failed; stored credentials were cleared.");
                Err(ApiError::Unauthorized.into())
            }
        }
    }

    pub(crate) fn status_line(config: &Config, logged_in: bool) -> String {
        let base_url = config
            .base_url()
            .map(|url| url.to_string())
            .unwrap_or_else(|_| "<invalid>".to_string());
        let backend = match config.credentials.backend {
            CredentialBackend::Memory => "memory".to_string(),
            CredentialBackend::Keyring => format!(
                "keyring {}/{}",
                config.credentials.service, config.credentials.account
            ),
        };
        let state = if logged_in { "logged in" } else { "not logged in" };
        format!("{} ({}; credentials: {})", state, base_url, backend)
    }

    fn warn_if_ephemeral(config: &Config) {
        if config.credentials.backend == CredentialBackend::Memory {
            println!("Note: the memory credential backend does not persist tokens after exit.");
        }
    }

}

// Request command handlers
pub mod request {
    use super::*;
    use serde_json::Value;

    /// Authenticated GET; prints the response as pretty JSON
    pub async fn get(config: Config, path: String, query: Vec<(String, String)>) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        let endpoint = query
            .into_iter()
            .fold(RawEndpoint::get(path), |endpoint, (k, v)| endpoint.with_query(k, v));
        let value: Value = client.request(&endpoint).await?;
        println!("{}", render(&value)?);
        Ok(())
    }

    /// Authenticated POST with an optional JSON body; prints the response
    pub async fn post(config: Config, path: String, data: Option<String>) -> Result<()> {
        let client = ApiClient::from_config(&config)?;
        let mut endpoint = RawEndpoint::post(path);
        if let Some(body) = parse_body(data.as_deref())? {
            endpoint = endpoint.with_body(body);
        }
        let value: Value = client.request(&endpoint).await?;
        println!("{}", render(&value)?);
        Ok(())
    }

    pub(crate) fn parse_body(data: Option<&str>) -> Result<Option<Value>> {
        match data {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|e| ApiError::Config(format!("--data is not valid JSON: {}", e)).into()),
        }
    }

    fn render(value: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(value)?)
    }

}
