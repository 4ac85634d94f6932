//! Login and logout
//!
//! Login is the only way a token pair enters the store from the outside;
//! refreshes replace it, logout and failed refreshes clear it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::token_store::{CredentialStore, TokenPair};
use crate::client::ApiClient;
use crate::endpoint::RawEndpoint;
use crate::error::Result;

/// Path of the login endpoint, relative to the API base URL
pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Successful login response.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Logs in with email and password and stores the issued token pair.
///
/// The login call carries no bearer header and never triggers a refresh.
/// Rejected credentials come back as
/// [`ApiError::Server`](crate::error::ApiError::Server) with status `401`
/// and the server's message.
///
/// # Errors
///
/// Propagates request errors, and store errors if the pair cannot be saved.
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<AuthResponse> {
    let body = serde_json::to_value(LoginRequest { email, password })?;
    let endpoint = RawEndpoint::post(LOGIN_PATH)
        .with_body(body)
        .unauthenticated();

    let response: AuthResponse = client.request(&endpoint).await?;
    client
        .store()
        .save(&TokenPair::new(&response.token, &response.refresh_token))?;

    tracing::info!(expires_at = ?response.expires_at, "Logged in");
    Ok(response)
}

/// Removes any stored credentials.
pub fn logout(store: &dyn CredentialStore) -> Result<()> {
    store.clear()?;
    tracing::info!("Logged out");
    Ok(())
}
