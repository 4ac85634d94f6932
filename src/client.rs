//! Authenticated API client
//!
//! [`ApiClient`] is what applications call. Every request is stamped with
//! the current bearer token, sent, and on a `401` handed to the
//! [`RefreshCoordinator`]. A `Retry` verdict reissues the request with the
//! refreshed token; anything else ends in [`ApiError::Unauthorized`].
//! Statuses other than `401` are never inspected by the refresh path, and
//! unauthenticated endpoints (login) never enter it at all: their `401` is
//! reported like any other error status.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::auth::adapter::RequestAdapter;
use crate::auth::coordinator::{RefreshCoordinator, Verdict};
use crate::auth::refresh::{HttpRefreshClient, RefreshClient};
use crate::auth::token_store::{CredentialStore, KeyringTokenStore, MemoryTokenStore};
use crate::config::{Config, CredentialBackend};
use crate::endpoint::Endpoint;
use crate::error::{ApiError, Result};
use crate::transport::http::HttpTransport;
use crate::transport::{RequestDescriptor, ResponseDescriptor, Transport, AUTHORIZATION};

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Client for the Madabank API.
///
/// Cheap to clone; clones share the transport, the credential store and the
/// refresh coordinator.
///
/// # Examples
///
/// ```no_run
/// use madabank_net::client::ApiClient;
/// use madabank_net::config::Config;
/// use madabank_net::endpoint::RawEndpoint;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = ApiClient::from_config(&Config::default())?;
/// let profile: serde_json::Value = client.request(&RawEndpoint::get("/users/profile")).await?;
/// println!("{}", profile);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    adapter: RequestAdapter,
    coordinator: RefreshCoordinator,
    base_url: Url,
    max_auth_retries: u32,
}

impl ApiClient {
    /// Creates a client with one refresh-and-retry round per request.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        refresher: Arc<dyn RefreshClient>,
        base_url: Url,
    ) -> Self {
        let coordinator = RefreshCoordinator::new(Arc::clone(&store), refresher);
        Self {
            transport,
            adapter: RequestAdapter::new(Arc::clone(&store)),
            store,
            coordinator,
            base_url,
            max_auth_retries: 1,
        }
    }

    /// Sets how many refresh-and-retry rounds a single request may use.
    pub fn with_max_auth_retries(mut self, max_auth_retries: u32) -> Self {
        self.max_auth_retries = max_auth_retries;
        self
    }

    /// Wires the HTTP transport, credential store, refresh client and
    /// coordinator described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] for unusable URLs and
    /// [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(config.request_timeout())?);
        let store: Arc<dyn CredentialStore> = match config.credentials.backend {
            CredentialBackend::Memory => Arc::new(MemoryTokenStore::default()),
            CredentialBackend::Keyring => Arc::new(KeyringTokenStore::new(
                config.credentials.service.clone(),
                config.credentials.account.clone(),
            )),
        };
        let refresher = Arc::new(HttpRefreshClient::new(
            Arc::clone(&transport),
            config.refresh_url()?,
            config.refresh_timeout(),
        ));

        Ok(Self::new(transport, store, refresher, config.base_url()?)
            .with_max_auth_retries(config.auth.max_auth_retries))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Sends an authenticated request.
    ///
    /// Returns the response for any status other than `401`, including
    /// errors such as `500`, without inspecting it further.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when a `401` could not be recovered
    /// by a refresh, and propagates transport errors unchanged.
    pub async fn send(&self, request: RequestDescriptor) -> Result<ResponseDescriptor> {
        let mut rounds = 0;
        loop {
            let generation = self.coordinator.generation();
            let adapted = self.adapter.adapt(request.clone());
            let sent_token = adapted.header(AUTHORIZATION).map(str::to_string);
            let response = self.transport.send(adapted).await?;

            if !response.is_unauthorized() {
                return Ok(response);
            }

            if rounds >= self.max_auth_retries {
                tracing::warn!(url = %request.url, rounds, "Request still unauthorized after refresh");
                return Err(ApiError::Unauthorized.into());
            }
            rounds += 1;

            // The token was replaced while this request was in flight; retry
            // with the new one instead of starting another session.
            let current = self
                .store
                .current_access()
                .map(|token| format!("Bearer {}", token));
            if current.is_some() && current != sent_token {
                tracing::debug!(url = %request.url, "Retrying with token refreshed in flight");
                continue;
            }

            tracing::debug!(url = %request.url, "Received 401; waiting for token refresh");
            match self.coordinator.handle_auth_failure_since(generation).await {
                Verdict::Retry => continue,
                Verdict::DoNotRetry => return Err(ApiError::Unauthorized.into()),
            }
        }
    }

    /// Calls `endpoint` and decodes a JSON response body.
    ///
    /// # Errors
    ///
    /// Non-2xx statuses become [`ApiError::Server`] (or
    /// [`ApiError::NotFound`]); an undecodable 2xx body is
    /// [`ApiError::Decoding`].
    pub async fn request<T: DeserializeOwned>(&self, endpoint: &dyn Endpoint) -> Result<T> {
        let response = self.execute(endpoint).await?;
        response.json()
    }

    /// Calls `endpoint` and discards the response body.
    pub async fn request_void(&self, endpoint: &dyn Endpoint) -> Result<()> {
        self.execute(endpoint).await.map(|_| ())
    }

    async fn execute(&self, endpoint: &dyn Endpoint) -> Result<ResponseDescriptor> {
        let request = RequestDescriptor::from_endpoint(endpoint, &self.base_url)?;
        tracing::debug!(method = %request.method, url = %request.url, "Sending request");

        let response = if endpoint.requires_auth() {
            self.send(request).await?
        } else {
            self.transport.send(request).await?
        };

        validate_status(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("transport", &self.transport)
            .field("coordinator", &self.coordinator)
            .field("max_auth_retries", &self.max_auth_retries)
            .finish()
    }
}

fn validate_status(response: ResponseDescriptor) -> Result<ResponseDescriptor> {
    if response.is_success() {
        return Ok(response);
    }

    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message);
    tracing::debug!(status = response.status, ?message, "Request failed");

    if response.status == 404 && message.is_none() {
        return Err(ApiError::NotFound.into());
    }
    Err(ApiError::Server {
        status: response.status,
        message,
    }
    .into())
}
