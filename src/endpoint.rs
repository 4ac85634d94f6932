//! Endpoint descriptions
//!
//! An [`Endpoint`] says what to call: method, path relative to the API base
//! URL, query pairs, an optional JSON body and extra headers.
//! [`RequestDescriptor::from_endpoint`](crate::transport::RequestDescriptor::from_endpoint)
//! turns it into a concrete request.
//!
//! Route enumeration is left to applications; [`RawEndpoint`] covers ad-hoc
//! calls such as the ones issued by the CLI.

use serde_json::Value;

use crate::transport::Method;

/// Something the API client can call.
pub trait Endpoint: Send + Sync {
    fn method(&self) -> Method;

    /// Path relative to the base URL, e.g. `/accounts/42`.
    fn path(&self) -> String;

    fn query(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn body(&self) -> Option<Value> {
        None
    }

    fn headers(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Whether the bearer credential is attached and a `401` may trigger a
    /// token refresh. Login-style endpoints return `false`.
    fn requires_auth(&self) -> bool {
        true
    }
}

/// A generic endpoint assembled at runtime.
///
/// # Examples
///
/// ```
/// use madabank_net::endpoint::{Endpoint, RawEndpoint};
/// use madabank_net::transport::Method;
///
/// let endpoint = RawEndpoint::get("/transactions/history").with_query("page", "1");
/// assert_eq!(endpoint.method(), Method::Get);
/// assert_eq!(endpoint.query(), vec![("page".to_string(), "1".to_string())]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RawEndpoint {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
    pub requires_auth: bool,
}

impl RawEndpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
            requires_auth: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Marks the endpoint as callable without a credential.
    pub fn unauthenticated(mut self) -> Self {
        self.requires_auth = false;
        self
    }
}

impl Endpoint for RawEndpoint {
    fn method(&self) -> Method {
        self.method
    }

    fn path(&self) -> String {
        self.path.clone()
    }

    fn query(&self) -> Vec<(String, String)> {
        self.query.clone()
    }

    fn body(&self) -> Option<Value> {
        self.body.clone()
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.headers.clone()
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_endpoint_defaults_to_authenticated() {
        let endpoint = RawEndpoint::get("/users/profile");
        assert!(endpoint.requires_auth());
        assert!(endpoint.body().is_none());
        assert!(endpoint.headers().is_empty());
    }

    #[test]
    fn test_unauthenticated_clears_requires_auth() {
        let endpoint = RawEndpoint::post("/auth/login").unauthenticated();
        assert!(!endpoint.requires_auth());
    }

    #[test]
    fn test_builder_accumulates_in_order() {
        let endpoint = RawEndpoint::get("/x")
            .with_query("a", "1")
            .with_query("b", "2")
            .with_header("X-One", "1");
        assert_eq!(
            endpoint.query(),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string())
            ]
        );
        assert_eq!(endpoint.headers().len(), 1);
    }
}
