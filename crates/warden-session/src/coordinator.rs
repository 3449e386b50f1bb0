//! Single-flight token refresh.
//!
//! # Why single-flight?
//!
//! When a token expires, every request in flight notices at about the same
//! time. If each of them called the refresh endpoint on its own, the
//! backend would see N refreshes racing to rotate the same refresh cookie,
//! and all but one of them could end up holding a token the backend has
//! already invalidated.
//!
//! [`RefreshCoordinator::refresh`] therefore keeps at most one refresh
//! outstanding. The first caller starts it; everyone who asks while it is
//! running gets a clone of the same [`Shared`] future and observes the
//! same token or the same failure. Once it settles the slot is emptied, so
//! the next caller starts a fresh attempt instead of replaying a stale
//! result forever.
//!
//! # Relevance check
//!
//! A logout does not cancel an outstanding refresh. Instead, the refresh
//! remembers the session generation it started under and only writes its
//! result if that is still the current one (see [`crate::state`]).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use warden_protocol::AccessToken;
use warden_store::KeyValueStore;

use crate::navigator::{Redirector, SESSION_EXPIRED_MESSAGE};
use crate::state::{RefreshApplied, SessionCell};
use crate::{AuthBackend, RefreshError, SessionConfig};

type RefreshFuture = Shared<BoxFuture<'static, Result<AccessToken, RefreshError>>>;

// ---------------------------------------------------------------------------
// SessionCore
// ---------------------------------------------------------------------------

/// Everything the session layer shares between the facade, the
/// coordinator, and the gates.
pub(crate) struct SessionCore<B, S> {
    pub(crate) backend: B,
    pub(crate) cell: SessionCell<S>,
    pub(crate) redirector: Redirector,
    pub(crate) config: SessionConfig,
}

impl<B: AuthBackend, S: KeyValueStore> SessionCore<B, S> {
    /// One refresh attempt, start to finish. Only ever run inside a flight.
    ///
    /// `generation` is the one observed when the flight was created, not
    /// when it is first polled.
    async fn refresh_once(&self, generation: u64) -> Result<AccessToken, RefreshError> {
        let timeout = self.config.refresh_timeout();
        tracing::debug!(generation, "refreshing access token");

        let outcome = match tokio::time::timeout(timeout, self.backend.refresh()).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(RefreshError::from(e)),
            Err(_) => Err(RefreshError::TimedOut(timeout)),
        };

        let err = match outcome {
            Ok(response) => {
                let token = response.access_token;
                match self.cell.finish_refresh(generation, token.clone(), response.user) {
                    RefreshApplied::Applied => {
                        tracing::info!(generation, "access token refreshed");
                        return Ok(token);
                    }
                    RefreshApplied::Stale => return self.superseded(generation),
                    RefreshApplied::MissingUser => RefreshError::MissingUser,
                }
            }
            Err(e) => e,
        };

        if !self.cell.fail_refresh(generation) {
            return self.superseded(generation);
        }
        tracing::warn!(generation, error = %err, "token refresh failed, session ended");
        self.redirector.redirect_to_login(SESSION_EXPIRED_MESSAGE, true);
        Err(err)
    }

    /// The session moved on while the refresh was outstanding. If a newer
    /// session exists, its token is as good an answer as any.
    fn superseded(&self, generation: u64) -> Result<AccessToken, RefreshError> {
        tracing::debug!(generation, "refresh result discarded, session changed");
        self.cell.current_token().ok_or(RefreshError::Superseded)
    }
}

// ---------------------------------------------------------------------------
// RefreshCoordinator
// ---------------------------------------------------------------------------

struct Flight {
    id: u64,
    future: RefreshFuture,
}

/// Owner of the at-most-one outstanding refresh.
///
/// Cheap to clone; clones share the same slot. The request and response
/// gates each hold one.
pub struct RefreshCoordinator<B, S> {
    core: Arc<SessionCore<B, S>>,
    inflight: Arc<Mutex<Option<Flight>>>,
    next_flight: Arc<AtomicU64>,
}

impl<B, S> Clone for RefreshCoordinator<B, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            inflight: Arc::clone(&self.inflight),
            next_flight: Arc::clone(&self.next_flight),
        }
    }
}

impl<B: AuthBackend, S: KeyValueStore> RefreshCoordinator<B, S> {
    pub(crate) fn new(core: Arc<SessionCore<B, S>>) -> Self {
        Self {
            core,
            inflight: Arc::new(Mutex::new(None)),
            next_flight: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the outstanding refresh, starting one if there is none.
    ///
    /// The returned future is `'static` and can be awaited from anywhere.
    /// Dropping it does not cancel the refresh for the other callers.
    ///
    /// On failure the session has already been ended, the stored
    /// credentials cleared, and the user sent to the login page, unless the
    /// error is [`RefreshError::Superseded`].
    pub fn refresh(
        &self,
    ) -> impl Future<Output = Result<AccessToken, RefreshError>> + Send + 'static + use<B, S> {
        let mut slot = self.inflight.lock();
        if let Some(flight) = slot.as_ref() {
            tracing::trace!(flight = flight.id, "joining outstanding refresh");
            return flight.future.clone();
        }

        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let generation = self.core.cell.begin_refresh();
        let future = run_flight(
            Arc::clone(&self.core),
            Arc::downgrade(&self.inflight),
            id,
            generation,
        )
        .boxed()
        .shared();
        *slot = Some(Flight {
            id,
            future: future.clone(),
        });
        future
    }

    /// Whether a refresh is outstanding right now.
    pub fn is_refreshing(&self) -> bool {
        self.inflight.lock().is_some()
    }

    /// The access token requests should carry: the session's, or before
    /// bootstrap has run, the stored one.
    pub fn current_token(&self) -> Option<AccessToken> {
        self.core
            .cell
            .current_token()
            .or_else(|| self.core.cell.store().access_token())
    }

    /// Whether a user profile is stored, i.e. a refresh has something to
    /// attach a new token to.
    pub fn has_user(&self) -> bool {
        self.core.cell.snapshot().user().is_some() || self.core.cell.store().user().is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }
}

async fn run_flight<B: AuthBackend, S: KeyValueStore>(
    core: Arc<SessionCore<B, S>>,
    slot: Weak<Mutex<Option<Flight>>>,
    id: u64,
    generation: u64,
) -> Result<AccessToken, RefreshError> {
    let outcome = core.refresh_once(generation).await;

    // Only clear our own flight; the slot may already hold a newer one.
    if let Some(slot) = slot.upgrade() {
        let mut slot = slot.lock();
        if slot.as_ref().is_some_and(|flight| flight.id == id) {
            *slot = None;
        }
    }
    outcome
}
