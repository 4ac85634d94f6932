//! Bearer header stamping
//!
//! [`RequestAdapter`] reads the current access token at the moment a request
//! is about to be sent and writes it into the `Authorization` header.

use std::sync::Arc;

use crate::auth::token_store::CredentialStore;
use crate::transport::{RequestDescriptor, AUTHORIZATION};

/// Stamps outgoing requests with `Authorization: Bearer <access token>`.
///
/// The adapter borrows the credential store; it never caches the token, so
/// a request adapted after a refresh carries the refreshed token.
#[derive(Clone)]
pub struct RequestAdapter {
    store: Arc<dyn CredentialStore>,
}

impl RequestAdapter {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Returns `request` with the bearer header set from the current token.
    ///
    /// Any existing authorization header is replaced. With no stored token
    /// the request is returned unchanged, which the server will reject with
    /// a `401`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use madabank_net::auth::adapter::RequestAdapter;
    /// use madabank_net::auth::token_store::{MemoryTokenStore, TokenPair};
    /// use madabank_net::transport::{Method, RequestDescriptor};
    ///
    /// let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("t1", "r1")));
    /// let adapter = RequestAdapter::new(store);
    ///
    /// let url = url::Url::parse("https://api.example.com/accounts").unwrap();
    /// let request = adapter.adapt(RequestDescriptor::new(Method::Get, url));
    /// assert_eq!(request.header("Authorization"), Some("Bearer t1"));
    /// ```
    pub fn adapt(&self, mut request: RequestDescriptor) -> RequestDescriptor {
        if let Some(token) = self.store.current_access() {
            request.set_header(AUTHORIZATION, format!("Bearer {}", token));
        }
        request
    }
}

impl std::fmt::Debug for RequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAdapter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token_store::{MemoryTokenStore, TokenPair};
    use crate::transport::Method;

    fn request() -> RequestDescriptor {
        RequestDescriptor::new(
            Method::Get,
            url::Url::parse("https://api.example.com/users/profile").unwrap(),
        )
        .with_header("Content-Type", "application/json")
    }

    #[test]
    fn test_adapt_sets_bearer_header() {
        let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("tok123", "r")));
        let adapted = RequestAdapter::new(store).adapt(request());
        assert_eq!(adapted.header(AUTHORIZATION), Some("Bearer tok123"));
    }

    #[test]
    fn test_adapt_without_token_adds_no_header() {
        let store = Arc::new(MemoryTokenStore::default());
        let adapted = RequestAdapter::new(store).adapt(request());
        assert!(adapted.header(AUTHORIZATION).is_none());
        assert!(
            !adapted.headers.keys().any(|k| k.eq_ignore_ascii_case(AUTHORIZATION)),
            "no empty authorization header may be inserted"
        );
    }

    #[test]
    fn test_adapt_replaces_existing_header_any_case() {
        let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("new", "r")));
        let stale = request().with_header("authorization", "Bearer old");
        let adapted = RequestAdapter::new(store).adapt(stale);
        let auth_headers: Vec<_> = adapted
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(AUTHORIZATION))
            .collect();
        assert_eq!(auth_headers.len(), 1);
        assert_eq!(auth_headers[0].1, "Bearer new");
    }

    #[test]
    fn test_adapt_preserves_other_headers() {
        let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("tok", "r")));
        let adapted = RequestAdapter::new(store).adapt(request());
        assert_eq!(adapted.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_adapt_reads_token_at_call_time() {
        let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("t1", "r1")));
        let adapter = RequestAdapter::new(store.clone());
        assert_eq!(adapter.adapt(request()).header(AUTHORIZATION), Some("Bearer t1"));

        store.save(&TokenPair::new("t2", "r2")).unwrap();
        assert_eq!(adapter.adapt(request()).header(AUTHORIZATION), Some("Bearer t2"));
    }
}
