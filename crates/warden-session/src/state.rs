//! The session state machine.
//!
//! ```text
//!                 bootstrap                    login
//! Uninitialized ───────────→ Anonymous ─────────────────→ Authenticated
//!       │                        ↑   ←───────────────────      │  ↺ refresh
//!       │                        │   logout / refresh failure   │
//!       └────── bootstrap ───────┼──────────────────────────────┘
//! ```
//!
//! Two flags sit next to the state rather than inside it:
//!
//! - `refreshing`: a refresh call is outstanding. Observable in any state.
//! - `initialized`: bootstrap has settled. UI must not render protected
//!   content before it flips, or users see a flash of the login page while
//!   a perfectly good session is still being restored.
//!
//! # Who writes what
//!
//! [`SessionCell`] is the only writer of both the in-memory state and the
//! [`CredentialStore`]. Every transition updates the two together while
//! holding the watch channel's write lock, so no observer can see a new
//! token with an old user, or memory and disk disagreeing.
//!
//! Transitions that end or replace a session (login, logout, refresh
//! failure) bump a generation counter. A refresh remembers the generation
//! it started under, and its result is only applied if that is still the
//! current one.

use tokio::sync::watch;
use warden_protocol::{AccessToken, UserProfile};
use warden_store::{CredentialStore, KeyValueStore, StoreError};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// `Authenticated` always carries both a token and a user, so
/// "authenticated" and "has a token and a user" mean the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    /// The process just started; storage hasn't been reconciled yet.
    #[default]
    Uninitialized,

    /// No usable credential.
    Anonymous,

    /// Signed in.
    Authenticated {
        access_token: AccessToken,
        user: UserProfile,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        match self {
            SessionState::Authenticated { access_token, .. } => Some(access_token),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// What subscribers see: the state plus its orthogonal flags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub refreshing: bool,
    pub initialized: bool,
    generation: u64,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.state.access_token()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.state.user()
    }

    /// Bumped by every login, logout, and terminal refresh failure.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ---------------------------------------------------------------------------
// SessionCell
// ---------------------------------------------------------------------------

/// What happened to a successful refresh response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefreshApplied {
    /// Stored and now `Authenticated`.
    Applied,
    /// The session changed generation meanwhile; nothing was written.
    Stale,
    /// No user profile from the response, memory, or storage.
    MissingUser,
}

/// Owner of the in-memory state and the durable credentials.
pub(crate) struct SessionCell<S> {
    tx: watch::Sender<SessionSnapshot>,
    store: CredentialStore<S>,
}

impl<S: KeyValueStore> SessionCell<S> {
    pub(crate) fn new(store: CredentialStore<S>) -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self { tx, store }
    }

    pub(crate) fn store(&self) -> &CredentialStore<S> {
        &self.store
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub(crate) fn current_token(&self) -> Option<AccessToken> {
        self.tx.borrow().access_token().cloned()
    }

    /// Login: persist, then become `Authenticated` under a new generation.
    ///
    /// Nothing changes if the write fails.
    pub(crate) fn sign_in(
        &self,
        access_token: AccessToken,
        user: UserProfile,
    ) -> Result<(), StoreError> {
        let mut result = Ok(());
        self.tx.send_if_modified(|snap| {
            if let Err(e) = self.store.set(&access_token, &user) {
                result = Err(e);
                return false;
            }
            snap.state = SessionState::Authenticated { access_token, user };
            snap.generation += 1;
            true
        });
        result
    }

    /// Logout: clear storage and become `Anonymous` under a new generation.
    ///
    /// Never fails: a storage error is logged and the in-memory session is
    /// ended regardless.
    pub(crate) fn sign_out(&self) {
        self.tx.send_modify(|snap| {
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "could not clear stored credentials");
            }
            snap.state = SessionState::Anonymous;
            snap.generation += 1;
        });
    }

    /// Bootstrap: adopt credentials that are already in storage.
    ///
    /// Only applies while still `Uninitialized`, so a login that raced
    /// ahead of bootstrap wins.
    pub(crate) fn restore(&self, access_token: AccessToken, user: UserProfile) {
        self.tx.send_if_modified(|snap| {
            if snap.state != SessionState::Uninitialized {
                return false;
            }
            snap.state = SessionState::Authenticated { access_token, user };
            true
        });
    }

    /// Bootstrap: nothing usable was stored. Optionally wipes leftovers.
    ///
    /// Only applies while still `Uninitialized`.
    pub(crate) fn settle_anonymous(&self, clear_store: bool) {
        self.tx.send_if_modified(|snap| {
            if snap.state != SessionState::Uninitialized {
                return false;
            }
            if clear_store {
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "could not clear stored credentials");
                }
            }
            snap.state = SessionState::Anonymous;
            true
        });
    }

    pub(crate) fn mark_initialized(&self) {
        self.tx.send_if_modified(|snap| {
            let changed = !snap.initialized;
            snap.initialized = true;
            changed
        });
    }

    /// Raises `refreshing` and returns the generation the refresh runs
    /// under.
    pub(crate) fn begin_refresh(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snap| {
            snap.refreshing = true;
            generation = snap.generation;
        });
        generation
    }

    /// Applies a successful refresh if `generation` is still current.
    ///
    /// The user comes from the response if it carried one, else from the
    /// current state, else from storage. `refreshing` is lowered in every
    /// case.
    pub(crate) fn finish_refresh(
        &self,
        generation: u64,
        access_token: AccessToken,
        user: Option<UserProfile>,
    ) -> RefreshApplied {
        let mut applied = RefreshApplied::Stale;
        self.tx.send_modify(|snap| {
            snap.refreshing = false;
            if snap.generation != generation {
                return;
            }

            let user = user
                .or_else(|| snap.user().cloned())
                .or_else(|| self.store.user());
            let Some(user) = user else {
                applied = RefreshApplied::MissingUser;
                return;
            };

            if let Err(e) = self.store.set(&access_token, &user) {
                // Keep the session usable for this process; the next start
                // will simply refresh again.
                tracing::warn!(error = %e, "could not persist refreshed token");
            }
            snap.state = SessionState::Authenticated { access_token, user };
            applied = RefreshApplied::Applied;
        });
        applied
    }

    /// Ends the session after a failed refresh, if `generation` is still
    /// current. Returns whether it did.
    ///
    /// `refreshing` is lowered in every case.
    pub(crate) fn fail_refresh(&self, generation: u64) -> bool {
        let mut ended = false;
        self.tx.send_modify(|snap| {
            snap.refreshing = false;
            if snap.generation != generation {
                return;
            }
            if let Err(e) = self.store.clear() {
                tracing::warn!(error = %e, "could not clear stored credentials");
            }
            snap.state = SessionState::Anonymous;
            snap.generation += 1;
            ended = true;
        });
        ended
    }

    /// Replaces the profile of the signed-in user.
    ///
    /// Returns `Ok(false)` without writing anything when nobody is signed
    /// in.
    pub(crate) fn update_user(&self, user: UserProfile) -> Result<bool, StoreError> {
        let mut result = Ok(false);
        self.tx.send_if_modified(|snap| {
            let SessionState::Authenticated { user: current, .. } = &mut snap.state
            else {
                return false;
            };
            if let Err(e) = self.store.set_user(&user) {
                result = Err(e);
                return false;
            }
            *current = user;
            result = Ok(true);
            true
        });
        result
    }
}
