//! Bearer authentication and coordinated token refresh
//!
//! # Module Layout
//!
//! - [`token_store`] -- Token pair persistence (memory or OS keyring)
//! - [`adapter`]     -- Stamps requests with the current bearer token
//! - [`refresh`]     -- Refresh-token exchange against the refresh endpoint
//! - [`coordinator`] -- Single-flight refresh shared by all failing requests
//! - [`session`]     -- Login and logout

pub mod adapter;
pub mod coordinator;
pub mod refresh;
pub mod session;
pub mod token_store;

pub use adapter::RequestAdapter;
pub use coordinator::{RefreshCoordinator, Verdict};
pub use refresh::{HttpRefreshClient, RefreshClient};
pub use token_store::{CredentialStore, KeyringTokenStore, MemoryTokenStore, TokenPair};
