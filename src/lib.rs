//! madabank-net - Authenticated HTTP client library
//!
//! This library provides the networking layer of the Madabank client:
//! bearer-token authentication with transparent, coordinated token refresh.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Credential storage, bearer stamping, refresh exchange and the
//!   single-flight refresh coordinator
//! - `client`: The `ApiClient` facade used by applications
//! - `transport`: Request/response descriptors and the HTTP transport
//! - `endpoint`: Endpoint descriptions turned into requests
//! - `config`: Configuration management and validation
//! - `metrics`: Refresh session metrics
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! When many requests fail with `401` at once, exactly one refresh call is
//! made; every request waiting on it is retried (or failed) together.
//!
//! # Example
//!
//! ```no_run
//! use madabank_net::{ApiClient, Config};
//! use madabank_net::endpoint::RawEndpoint;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let client = ApiClient::from_config(&config)?;
//!     let balance: serde_json::Value = client.request(&RawEndpoint::get("/accounts/balance")).await?;
//!     println!("{}", balance);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod metrics;
pub mod transport;

// Re-export commonly used types
pub use auth::{CredentialStore, RefreshCoordinator, TokenPair, Verdict};
pub use client::ApiClient;
pub use config::Config;
pub use error::{ApiError, RefreshError, Result};
