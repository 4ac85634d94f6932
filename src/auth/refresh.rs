//! Refresh-token exchange
//!
//! [`RefreshClient`] is the out-of-band call that turns a refresh token into
//! a new [`TokenPair`]. [`HttpRefreshClient`] implements it against the
//! API's refresh endpoint:
//!
//! ```text
//! POST <refresh_url>
//! {"refresh_token": "<refresh>"}
//!
//! 200 {"token": "<access>", "refresh_token": "<refresh>"}
//! ```
//!
//! The request goes straight to the [`Transport`]; it is never stamped with
//! the (expired) bearer token and a `401` from the refresh endpoint is a
//! [`RefreshError::Rejected`], not a trigger for another refresh.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::token_store::TokenPair;
use crate::error::RefreshError;
use crate::transport::{Method, RequestDescriptor, Transport};

/// Exchanges a refresh token for a new token pair.
///
/// Implementations make one attempt per call; any retry policy for the
/// refresh call itself belongs inside the implementation.
#[async_trait::async_trait]
pub trait RefreshClient: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: String,
    refresh_token: String,
}

/// [`RefreshClient`] that POSTs to a fixed refresh URL.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use madabank_net::auth::refresh::{HttpRefreshClient, RefreshClient};
/// use madabank_net::transport::http::HttpTransport;
///
/// # async fn example() -> anyhow::Result<()> {
/// let transport = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
/// let client = HttpRefreshClient::new(
///     transport,
///     url::Url::parse("https://api.madabank.art/auth/refresh")?,
///     Duration::from_secs(15),
/// );
/// let pair = client.refresh("r1").await?;
/// println!("new access token issued: {}", !pair.access.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRefreshClient {
    transport: Arc<dyn Transport>,
    refresh_url: Url,
    timeout: Duration,
}

impl HttpRefreshClient {
    /// Creates a client for `refresh_url`; each refresh is abandoned after
    /// `timeout`.
    pub fn new(transport: Arc<dyn Transport>, refresh_url: Url, timeout: Duration) -> Self {
        Self {
            transport,
            refresh_url,
            timeout,
        }
    }

    pub fn refresh_url(&self) -> &Url {
        &self.refresh_url
    }
}

#[async_trait::async_trait]
impl RefreshClient for HttpRefreshClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let request = RequestDescriptor::new(Method::Post, self.refresh_url.clone())
            .with_header("Accept", "application/json")
            .with_json(&RefreshRequest { refresh_token })
            .map_err(|e| RefreshError::Transport(format!("failed to encode refresh request: {e}")))?;

        let response = tokio::time::timeout(self.timeout, self.transport.send(request))
            .await
            .map_err(|_| RefreshError::Timeout(self.timeout))?
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status,
            });
        }

        let raw: RefreshResponse = serde_json::from_slice(&response.body)
            .map_err(|e| RefreshError::Decoding(e.to_string()))?;

        Ok(TokenPair::new(raw.token, raw.refresh_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::transport::fake::FakeTransport;
    use crate::transport::ResponseDescriptor;

    fn refresh_url() -> Url {
        Url::parse("https://api.example.com/auth/refresh").unwrap()
    }

    fn client(transport: Arc<FakeTransport>, timeout: Duration) -> HttpRefreshClient {
        HttpRefreshClient::new(transport, refresh_url(), timeout)
    }

    #[tokio::test]
    async fn test_refresh_posts_refresh_token_as_json() {
        let transport = Arc::new(FakeTransport::always(
            200,
            r#"{"token":"t2","refresh_token":"r2"}"#,
        ));
        let pair = client(transport.clone(), Duration::from_secs(5))
            .refresh("r1")
            .await
            .expect("refresh");
        assert_eq!(pair, TokenPair::new("t2", "r2"));

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Post);
        assert_eq!(sent[0].url, refresh_url());
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
        assert!(sent[0].header("authorization").is_none());
        let body: serde_json::Value = serde_json::from_slice(sent[0].body.as_ref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"refresh_token": "r1"}));
    }

    #[tokio::test]
    async fn test_refresh_rejected_status() {
        let transport = Arc::new(FakeTransport::always(401, r#"{"message":"expired"}"#));
        let err = client(transport, Duration::from_secs(5))
            .refresh("bad")
            .await
            .unwrap_err();
        assert_eq!(err, RefreshError::Rejected { status: 401 });
    }

    #[tokio::test]
    async fn test_refresh_malformed_body_is_decoding_error() {
        let transport = Arc::new(FakeTransport::always(200, r#"{"access_token":"t2"}"#));
        let err = client(transport, Duration::from_secs(5))
            .refresh("r1")
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "decoding");
    }

    #[tokio::test]
    async fn test_refresh_transport_failure() {
        let transport = Arc::new(FakeTransport::new(|_| {
            Err(ApiError::Transport("connection reset".to_string()).into())
        }));
        let err = client(transport, Duration::from_secs(5))
            .refresh("r1")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Transport(ref m) if m.contains("connection reset")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_times_out() {
        let transport = Arc::new(
            FakeTransport::new(|_| Ok(ResponseDescriptor::new(200, "{}")))
                .with_delay(Duration::from_secs(60)),
        );
        let err = client(transport, Duration::from_secs(1))
            .refresh("r1")
            .await
            .unwrap_err();
        assert_eq!(err, RefreshError::Timeout(Duration::from_secs(1)));
    }
}
