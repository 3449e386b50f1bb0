//! Unified error type for Warden.

use warden_protocol::TokenError;
use warden_session::{BackendError, RefreshError, SessionError};
use warden_store::StoreError;
use warden_transport::TransportError;

/// Top-level error that wraps every crate-specific error.
///
/// `#[from]` on each wrapping variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    /// No response was received, or a non-auth error status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An access token could not be decoded.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Credentials could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An `/auth/*` call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A token refresh failed.
    #[error(transparent)]
    Refresh(#[from] RefreshError),

    /// Login, registration, or a profile update failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A protected request was still rejected after its one retry with a
    /// refreshed token, or no session exists to refresh.
    #[error("not authorized to access {path} ({status})")]
    Unauthorized { status: u16, path: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: WardenError = TransportError::Connect("refused".into()).into();
        assert!(matches!(err, WardenError::Transport(_)));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn test_from_token_error() {
        let err: WardenError = TokenError::Malformed("two segments".into()).into();
        assert!(matches!(err, WardenError::Token(_)));
    }

    #[test]
    fn test_from_refresh_error() {
        let err: WardenError = RefreshError::Superseded.into();
        assert!(matches!(err, WardenError::Refresh(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err: WardenError = SessionError::NotAuthenticated.into();
        assert!(matches!(err, WardenError::Session(_)));
    }

    #[test]
    fn test_unauthorized_names_path() {
        let err = WardenError::Unauthorized {
            status: 403,
            path: "/students".into(),
        };
        assert_eq!(err.to_string(), "not authorized to access /students (403)");
    }
}
