//! HTTP transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait through which every request
//! leaves the process, plus the plain-data request and response descriptors
//! that flow through it. Concrete implementations live in submodules:
//!
//! - [`http::HttpTransport`] -- `reqwest`-backed transport used in
//!   production.
//! - [`fake::FakeTransport`] -- scripted in-process fake used in tests
//!   (cfg(test) only).
//!
//! # Design
//!
//! A transport performs exactly one request. An HTTP response of any status
//! is `Ok`; only a failure to obtain a response at all (connect, DNS, TLS,
//! timeout) is an `Err`. Classifying statuses, including recognising `401`,
//! is the caller's job.

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

use crate::endpoint::Endpoint;
use crate::error::{ApiError, Result};

/// Header carrying the bearer credential.
pub const AUTHORIZATION: &str = "Authorization";

/// HTTP methods used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully built outgoing request.
///
/// Descriptors are cheap to clone; the body is a reference-counted
/// [`Bytes`] buffer, so the client can keep the original around for a retry
/// after a token refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Creates a request with no headers and no body.
    ///
    /// # Examples
    ///
    /// ```
    /// use madabank_net::transport::{Method, RequestDescriptor};
    ///
    /// let url = url::Url::parse("https://api.example.com/health").unwrap();
    /// let request = RequestDescriptor::new(Method::Get, url);
    /// assert!(request.headers.is_empty());
    /// assert!(request.body.is_none());
    /// ```
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets `name` to `value`, replacing any existing header whose name
    /// matches case-insensitively.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.into());
    }

    /// Builder-style variant of [`set_header`](Self::set_header).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Removes every header whose name matches `name` case-insensitively.
    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Serializes `value` as the JSON body and sets `Content-Type`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Serialization`] if `value` cannot be encoded.
    pub fn with_json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(value).map_err(ApiError::Serialization)?;
        self.body = Some(Bytes::from(encoded));
        self.set_header("Content-Type", "application/json");
        Ok(self)
    }

    /// Builds a descriptor for `endpoint` relative to `base_url`.
    ///
    /// The endpoint path is appended to the base URL's path, query pairs are
    /// URL-encoded, the JSON body (if any) is serialized with
    /// `Content-Type: application/json`, and `Accept: application/json` is
    /// always set. Endpoint headers are applied last.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidUrl`] if the joined URL does not parse and
    /// [`ApiError::Serialization`] if the body cannot be encoded.
    pub fn from_endpoint(endpoint: &dyn Endpoint, base_url: &Url) -> Result<Self> {
        let joined = format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            endpoint.path().trim_start_matches('/')
        );
        let mut url =
            Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))?;

        let query = endpoint.query();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in &query {
                pairs.append_pair(k, v);
            }
        }

        let mut request = RequestDescriptor::new(endpoint.method(), url)
            .with_header("Accept", "application/json");
        if let Some(body) = endpoint.body() {
            request = request.with_json(&body)?;
        }
        for (k, v) in endpoint.headers() {
            request.set_header(&k, v);
        }
        Ok(request)
    }
}

/// A received HTTP response, of any status.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl ResponseDescriptor {
    /// Creates a response with the given status and body and no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// `true` only for `401 Unauthorized`, the sole refresh trigger.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decoding`] if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decoding(e.to_string()).into())
    }
}

fn header_lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Abstraction over the HTTP stack.
///
/// Implementations must be shareable across tasks; the client, the refresh
/// client and any number of concurrent callers hold the same
/// `Arc<dyn Transport>`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Performs one request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when no response could be obtained.
    async fn send(&self, request: RequestDescriptor) -> Result<ResponseDescriptor>;
}

pub mod http;

#[cfg(test)]
pub mod fake;
