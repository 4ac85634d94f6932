//! Credential persistence
//!
//! This module defines the [`CredentialStore`] capability consumed by the
//! adapter and the refresh coordinator, the [`TokenPair`] value it holds, and
//! two implementations:
//!
//! - [`MemoryTokenStore`] -- process-local, used by tests and short-lived
//!   embedders.
//! - [`KeyringTokenStore`] -- persists the pair in the operating system's
//!   native credential store (Keychain on macOS, Secret Service on Linux,
//!   Windows Credential Manager on Windows), serialized as JSON.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// An access token together with the refresh token that can renew it.
///
/// A new pair always replaces the previous one in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// CredentialStore
// ---------------------------------------------------------------------------

/// Thread-safe holder of the current [`TokenPair`].
///
/// Implementations synchronize internally; callers share one store through
/// `Arc<dyn CredentialStore>` and never hold a private copy of the pair
/// beyond a single request attempt.
pub trait CredentialStore: Send + Sync {
    /// Returns the current pair, or `None` when logged out.
    fn get(&self) -> Option<TokenPair>;

    /// Replaces the current pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn save(&self, pair: &TokenPair) -> Result<()>;

    /// Forgets the current pair. Clearing an empty store is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the delete.
    fn clear(&self) -> Result<()>;

    fn current_access(&self) -> Option<String> {
        self.get().map(|pair| pair.access)
    }

    fn current_refresh(&self) -> Option<String> {
        self.get().map(|pair| pair.refresh)
    }
}

// ---------------------------------------------------------------------------
// MemoryTokenStore
// ---------------------------------------------------------------------------

/// In-memory credential store.
///
/// # Examples
///
/// ```
/// use madabank_net::auth::token_store::{CredentialStore, MemoryTokenStore, TokenPair};
///
/// let store = MemoryTokenStore::default();
/// assert!(store.current_access().is_none());
///
/// store.save(&TokenPair::new("t1", "r1")).unwrap();
/// assert_eq!(store.current_access().as_deref(), Some("t1"));
/// assert_eq!(store.current_refresh().as_deref(), Some("r1"));
///
/// store.clear().unwrap();
/// assert!(store.get().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    pair: RwLock<Option<TokenPair>>,
}

impl MemoryTokenStore {
    /// Creates a store that already holds `pair`.
    pub fn with_pair(pair: TokenPair) -> Self {
        Self {
            pair: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryTokenStore {
    fn get(&self) -> Option<TokenPair> {
        self.pair
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        *self
            .pair
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(pair.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .pair
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyringTokenStore
// ---------------------------------------------------------------------------

/// On-keyring representation of a [`TokenPair`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: String,
    /// When the pair was written; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

/// Credential store backed by the OS native keyring.
///
/// The pair is cached in memory after the first read so that stamping a
/// request does not hit the keyring; every write goes through to the
/// keyring before the cache is updated.
///
/// # Examples
///
/// ```no_run
/// use madabank_net::auth::token_store::{CredentialStore, KeyringTokenStore, TokenPair};
///
/// let store = KeyringTokenStore::new("madabank-net", "default");
/// store.save(&TokenPair::new("access", "refresh")).unwrap();
/// assert!(store.get().is_some());
/// ```
#[derive(Debug)]
pub struct KeyringTokenStore {
    service: String,
    account: String,
    /// `None` until the keyring has been read once.
    cache: RwLock<Option<Option<TokenPair>>>,
}

impl KeyringTokenStore {
    pub fn new(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
            cache: RwLock::new(None),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.account).map_err(|e| ApiError::Keyring(e).into())
    }

    /// Reads the pair straight from the keyring.
    ///
    /// Returns `Ok(None)` when nothing has been stored, so callers can tell
    /// "not logged in" apart from a genuine keyring error.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Keyring`] on an unexpected keyring failure and
    /// [`ApiError::Serialization`] if the stored JSON is malformed.
    pub fn load(&self) -> Result<Option<TokenPair>> {
        match self.entry()?.get_password() {
            Ok(json_str) => {
                let stored: StoredTokens =
                    serde_json::from_str(&json_str).map_err(ApiError::Serialization)?;
                Ok(Some(TokenPair::new(stored.access_token, stored.refresh_token)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(ApiError::Keyring(e).into()),
        }
    }

    fn set_cache(&self, value: Option<TokenPair>) {
        *self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(value);
    }
}

impl CredentialStore for KeyringTokenStore {
    fn get(&self) -> Option<TokenPair> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return cached.clone();
        }

        match self.load() {
            Ok(pair) => {
                self.set_cache(pair.clone());
                pair
            }
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Failed to read credentials from keyring");
                None
            }
        }
    }

    fn save(&self, pair: &TokenPair) -> Result<()> {
        let stored = StoredTokens {
            access_token: pair.access.clone(),
            refresh_token: pair.refresh.clone(),
            saved_at: Some(Utc::now()),
        };
        let json_str = serde_json::to_string(&stored).map_err(ApiError::Serialization)?;
        self.entry()?
            .set_password(&json_str)
            .map_err(ApiError::Keyring)?;
        self.set_cache(Some(pair.clone()));
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => return Err(ApiError::Keyring(e).into()),
        }
        self.set_cache(None);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
