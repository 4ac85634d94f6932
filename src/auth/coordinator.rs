//! Single-flight token refresh
//!
//! [`RefreshCoordinator`] is consulted whenever a request comes back `401`.
//! The first caller to arrive while no refresh is running starts one; every
//! caller arriving while it runs joins it. When the refresh resolves, every
//! joined caller receives the same [`Verdict`] exactly once:
//!
//! ```text
//!            401                      refresh ok: save pair
//!   Idle ----------> Refreshing ----------------------------> Idle
//!                     |  ^  401 (join)        (Retry to all)
//!                     +--+
//!                           refresh failed: clear store
//!                     ----------------------------------> Idle
//!                                     (DoNotRetry to all)
//! ```
//!
//! The session state lives behind one `std::sync::Mutex` that is never held
//! across an `.await`: deciding to start or join, appending a waiter, and
//! swapping back to `Idle` while taking the waiter list are each a single
//! critical section. The refresh call runs on a spawned task outside the
//! lock, and waiters are invoked after the lock is released.
//!
//! Every resolved session bumps a generation counter in the same critical
//! section as the swap to `Idle`. A caller that read the generation before
//! sending its request can pass it to
//! [`handle_auth_failure_since`](RefreshCoordinator::handle_auth_failure_since)
//! and reuse the outcome of a session that finished while it was in flight.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::FutureExt;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::auth::refresh::RefreshClient;
use crate::auth::token_store::{CredentialStore, TokenPair};
use crate::error::RefreshError;
use crate::metrics::RefreshSessionMetrics;

/// Outcome delivered to every caller waiting on a refresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The store holds a fresh pair; reissue the original request.
    Retry,
    /// The session ended; surface the original authorization failure.
    DoNotRetry,
}

type Waiter = Box<dyn FnOnce(Verdict) + Send + 'static>;

enum SessionState {
    Idle,
    Refreshing {
        session_id: Uuid,
        waiters: Vec<Waiter>,
    },
}

struct State {
    session: SessionState,
    /// Sessions resolved so far.
    generation: u64,
    /// Verdict of the most recently resolved session.
    last_verdict: Option<Verdict>,
}

struct Inner {
    store: Arc<dyn CredentialStore>,
    refresher: Arc<dyn RefreshClient>,
    state: Mutex<State>,
    refresh_calls: AtomicU64,
}

/// Coordinates token refreshes so that at most one runs at a time.
///
/// Cloning is cheap and clones share the same session state, so one
/// coordinator can serve every request made with one credential.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use madabank_net::auth::coordinator::{RefreshCoordinator, Verdict};
/// use madabank_net::auth::refresh::HttpRefreshClient;
/// use madabank_net::auth::token_store::{MemoryTokenStore, TokenPair};
/// use madabank_net::transport::http::HttpTransport;
///
/// # async fn example() -> anyhow::Result<()> {
/// let store = Arc::new(MemoryTokenStore::with_pair(TokenPair::new("t1", "r1")));
/// let transport = Arc::new(HttpTransport::new(Duration::from_secs(30))?);
/// let refresher = Arc::new(HttpRefreshClient::new(
///     transport,
///     url::Url::parse("https://api.madabank.art/auth/refresh")?,
///     Duration::from_secs(15),
/// ));
/// let coordinator = RefreshCoordinator::new(store, refresher);
///
/// // After a request came back 401:
/// if coordinator.handle_auth_failure().await == Verdict::Retry {
///     // reissue the request
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: Arc<dyn RefreshClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                refresher,
                state: Mutex::new(State {
                    session: SessionState::Idle,
                    generation: 0,
                    last_verdict: None,
                }),
                refresh_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Registers `on_verdict` with the current refresh session, starting a
    /// session if none is running.
    ///
    /// `on_verdict` is called exactly once, after the credential store has
    /// been updated. Inside a Tokio runtime the session runs on a spawned
    /// task; outside one it runs on a dedicated thread with its own
    /// current-thread runtime.
    pub fn handle_auth_failure_with<F>(&self, on_verdict: F)
    where
        F: FnOnce(Verdict) + Send + 'static,
    {
        self.enlist(None, Box::new(on_verdict));
    }

    /// Like [`handle_auth_failure_with`](Self::handle_auth_failure_with), for
    /// a request sent when the coordinator was at `generation`.
    ///
    /// If a session resolved since then and none is running now, its verdict
    /// is delivered right away instead of starting another refresh with a
    /// refresh token that may already have been rotated.
    pub fn handle_auth_failure_since_with<F>(&self, generation: u64, on_verdict: F)
    where
        F: FnOnce(Verdict) + Send + 'static,
    {
        self.enlist(Some(generation), Box::new(on_verdict));
    }

    /// Async form of [`handle_auth_failure_with`](Self::handle_auth_failure_with).
    ///
    /// Suspends the caller (without blocking the executor) until the session
    /// it joined resolves.
    pub async fn handle_auth_failure(&self) -> Verdict {
        let (tx, rx) = oneshot::channel();
        self.handle_auth_failure_with(move |verdict| {
            let _ = tx.send(verdict);
        });
        rx.await.unwrap_or(Verdict::DoNotRetry)
    }

    /// Async form of
    /// [`handle_auth_failure_since_with`](Self::handle_auth_failure_since_with).
    pub async fn handle_auth_failure_since(&self, generation: u64) -> Verdict {
        let (tx, rx) = oneshot::channel();
        self.handle_auth_failure_since_with(generation, move |verdict| {
            let _ = tx.send(verdict);
        });
        rx.await.unwrap_or(Verdict::DoNotRetry)
    }

    /// Number of sessions resolved since construction.
    pub fn generation(&self) -> u64 {
        self.inner.lock_state().generation
    }

    /// `true` while a refresh session is in flight.
    pub fn is_refreshing(&self) -> bool {
        matches!(self.inner.lock_state().session, SessionState::Refreshing { .. })
    }

    /// Number of refresh calls issued since construction.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    fn enlist(&self, observed: Option<u64>, waiter: Waiter) {
        enum Enlisted {
            Joined,
            Started(Uuid),
            Resolved(Verdict, Waiter),
        }

        let enlisted = {
            let mut guard = self.inner.lock_state();
            let state = &mut *guard;
            match &mut state.session {
                SessionState::Refreshing { waiters, .. } => {
                    waiters.push(waiter);
                    Enlisted::Joined
                }
                SessionState::Idle => match (observed, state.last_verdict) {
                    (Some(seen), Some(verdict)) if seen != state.generation => {
                        Enlisted::Resolved(verdict, waiter)
                    }
                    _ => {
                        let session_id = Uuid::new_v4();
                        state.session = SessionState::Refreshing {
                            session_id,
                            waiters: vec![waiter],
                        };
                        Enlisted::Started(session_id)
                    }
                },
            }
        };

        let session_id = match enlisted {
            Enlisted::Joined => {
                tracing::debug!("Joined in-flight token refresh");
                RefreshSessionMetrics::record_join();
                return;
            }
            Enlisted::Resolved(verdict, waiter) => {
                tracing::debug!(?verdict, "Token refresh finished while request was in flight");
                deliver(None, waiter, verdict);
                return;
            }
            Enlisted::Started(session_id) => session_id,
        };

        tracing::info!(%session_id, "Access token rejected; starting token refresh");
        let metrics = RefreshSessionMetrics::start();
        let inner = Arc::clone(&self.inner);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    inner.run_session(session_id, metrics).await;
                });
            }
            Err(_) => {
                tracing::debug!(%session_id, "No async runtime; running token refresh on a dedicated thread");
                let spawned = std::thread::Builder::new()
                    .name("madabank-token-refresh".to_string())
                    .spawn(move || match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime.block_on(inner.run_session(session_id, metrics)),
                        Err(e) => {
                            tracing::error!(%session_id, error = %e, "Failed to build runtime for token refresh");
                            inner.abandon(session_id);
                        }
                    });
                if let Err(e) = spawned {
                    tracing::error!(%session_id, error = %e, "Failed to spawn token refresh thread");
                    self.inner.abandon(session_id);
                }
            }
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("generation", &self.generation())
            .field("refresh_calls", &self.refresh_count())
            .finish()
    }
}

/// Calls one waiter, containing any panic so the rest of the session's
/// waiters are still released.
fn deliver(session_id: Option<Uuid>, waiter: Waiter, verdict: Verdict) {
    if std::panic::catch_unwind(AssertUnwindSafe(|| waiter(verdict))).is_err() {
        tracing::error!(session_id = ?session_id, ?verdict, "Token refresh waiter panicked");
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_session(&self, session_id: Uuid, metrics: RefreshSessionMetrics) {
        let outcome = AssertUnwindSafe(self.refresh_once())
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(RefreshError::Aborted("refresh client panicked".to_string())));
        self.resolve(session_id, outcome, metrics);
    }

    async fn refresh_once(&self) -> Result<TokenPair, RefreshError> {
        let refresh_token = self
            .store
            .current_refresh()
            .ok_or(RefreshError::MissingRefreshToken)?;
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresher.refresh(&refresh_token).await
    }

    /// Persists the outcome, swaps the state back to `Idle`, and releases
    /// every waiter of the session.
    fn resolve(
        &self,
        session_id: Uuid,
        outcome: Result<TokenPair, RefreshError>,
        metrics: RefreshSessionMetrics,
    ) {
        let outcome = outcome.and_then(|pair| {
            self.store.save(&pair).map_err(|e| {
                RefreshError::Aborted(format!("failed to store refreshed tokens: {e}"))
            })
        });

        let verdict = match &outcome {
            Ok(()) => Verdict::Retry,
            Err(e) => {
                tracing::warn!(%session_id, reason = e.reason(), error = %e, "Token refresh failed; clearing session");
                if let Err(clear_err) = self.store.clear() {
                    tracing::warn!(%session_id, error = %clear_err, "Failed to clear credentials");
                }
                Verdict::DoNotRetry
            }
        };

        let waiters = {
            let mut state = self.lock_state();
            state.generation += 1;
            state.last_verdict = Some(verdict);
            take_waiters(&mut state)
        };

        tracing::info!(%session_id, ?verdict, waiters = waiters.len(), "Token refresh session finished");
        match &outcome {
            Ok(()) => metrics.finish_success(waiters.len()),
            Err(e) => metrics.finish_failure(e, waiters.len()),
        }

        for waiter in waiters {
            deliver(Some(session_id), waiter, verdict);
        }
    }

    /// Ends a session that never got to run its refresh. The store and the
    /// generation are left as they are.
    fn abandon(&self, session_id: Uuid) {
        let waiters = take_waiters(&mut self.lock_state());
        tracing::warn!(%session_id, waiters = waiters.len(), "Token refresh abandoned; credentials kept");
        for waiter in waiters {
            deliver(Some(session_id), waiter, Verdict::DoNotRetry);
        }
    }
}

fn take_waiters(state: &mut State) -> Vec<Waiter> {
    match std::mem::replace(&mut state.session, SessionState::Idle) {
        SessionState::Refreshing { waiters, .. } => waiters,
        SessionState::Idle => Vec::new(),
    }
}
