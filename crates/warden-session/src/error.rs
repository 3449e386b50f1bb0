//! Error types for the session layer.

use std::time::Duration;

use warden_store::StoreError;
use warden_transport::TransportError;

/// Errors returned by an [`AuthBackend`](crate::AuthBackend) call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// No HTTP response was received.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The backend answered with a non-success status.
    #[error("backend rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The backend answered 2xx but the body didn't match the contract.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl BackendError {
    /// Whether the backend refused the credentials (401/403).
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, BackendError::Rejected { status: 401 | 403, .. })
    }
}

/// Why a token refresh did not produce a token.
///
/// Every variant except [`Superseded`](Self::Superseded) is terminal for
/// the session: local credentials are cleared and the user is sent back to
/// the login page. `Clone` because one refresh outcome is handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RefreshError {
    /// The refresh endpoint failed or rejected the refresh credential.
    #[error("refresh failed: {0}")]
    Backend(#[from] BackendError),

    /// The refresh endpoint did not answer in time.
    #[error("refresh failed: no response within {0:?}")]
    TimedOut(Duration),

    /// The refresh succeeded but no user profile is known to attach the
    /// new token to.
    #[error("refresh failed: no user profile to attach the token to")]
    MissingUser,

    /// The session was logged out (or replaced by a new login) while the
    /// refresh was in flight, and its result was discarded.
    #[error("refresh result discarded: the session changed while it was in flight")]
    Superseded,
}

/// Errors surfaced by [`SessionFacade`](crate::SessionFacade) operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backend refused the login or could not be reached.
    #[error("login failed: {0}")]
    Login(BackendError),

    /// The backend refused the registration or could not be reached.
    #[error("registration failed: {0}")]
    Register(BackendError),

    /// A token refresh failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Credentials could not be written to durable storage.
    #[error("could not persist credentials: {0}")]
    Store(#[from] StoreError),

    /// The operation needs a signed-in user.
    #[error("no user is signed in")]
    NotAuthenticated,
}
