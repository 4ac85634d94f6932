//! `reqwest`-backed HTTP transport
//!
//! [`HttpTransport`] turns a [`RequestDescriptor`] into a `reqwest` request,
//! sends it, and collects status, headers and body into a
//! [`ResponseDescriptor`]. It applies no authorization and makes no
//! decisions based on the status code.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::transport::{RequestDescriptor, ResponseDescriptor, Transport};

/// HTTP transport over a shared `reqwest::Client`.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use madabank_net::transport::http::HttpTransport;
///
/// let transport = HttpTransport::new(Duration::from_secs(30)).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Underlying reqwest HTTP client (connection pool, TLS).
    http_client: Arc<reqwest::Client>,
}

impl HttpTransport {
    /// Construct a new [`HttpTransport`] whose requests time out after
    /// `timeout`.
    ///
    /// No network I/O is performed at construction time.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the TLS backend cannot be
    /// initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("madabank-net/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(Arc::new(http_client)))
    }

    /// Wraps an existing client, e.g. one shared with other components.
    pub fn with_client(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseDescriptor> {
        let method = request.method;
        let url = request.url.clone();

        let mut req = self
            .http_client
            .request(method.into(), request.url.as_str());
        for (k, v) in &request.headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await.map_err(|e| {
            tracing::debug!(%method, %url, error = %e, "HTTP request failed");
            ApiError::Transport(format!("{method} {url} failed: {e}"))
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {e}")))?;

        tracing::debug!(%method, %url, status, "HTTP response received");

        Ok(ResponseDescriptor {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Method;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(server: &MockServer, p: &str) -> url::Url {
        url::Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
    }

    #[tokio::test]
    async fn test_send_forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("X-Trace", "abc"))
            .and(body_string("payload"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let mut request = RequestDescriptor::new(Method::Post, url(&server, "/echo"))
            .with_header("X-Trace", "abc");
        request.body = Some(bytes::Bytes::from_static(b"payload"));

        let response = transport.send(request).await.expect("send");
        assert_eq!(response.status, 201);
        assert_eq!(&response.body[..], b"created");
    }

    #[tokio::test]
    async fn test_send_returns_ok_for_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).insert_header("WWW-Authenticate", "Bearer"))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Duration::from_secs(5)).unwrap();
        let response = transport
            .send(RequestDescriptor::new(Method::Get, url(&server, "/x")))
            .await
            .expect("a 401 is a response, not a transport error");
        assert!(response.is_unauthorized());
        assert_eq!(response.header("www-authenticate"), Some("Bearer"));
    }

    #[tokio::test]
    async fn test_send_maps_connection_failure_to_transport_error() {
        // Port 9 (discard) on localhost is reliably closed in test sandboxes.
        let transport = HttpTransport::new(Duration::from_secs(2)).unwrap();
        let request = RequestDescriptor::new(
            Method::Get,
            url::Url::parse("http://127.0.0.1:9/unreachable").unwrap(),
        );
        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::Transport(_))
        ));
    }
}
