//! Error types for the protocol layer.

/// Errors that can occur while decoding an access token.
///
/// Callers in the session layer never surface this to the user: a token
/// that can't be decoded is treated exactly like an expired one, which
/// forces a refresh (or an anonymous session) instead of a crash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token is not a three-segment JWT, its payload is not valid
    /// base64url, or the payload has no usable `exp` claim.
    #[error("malformed access token: {0}")]
    Malformed(String),
}
