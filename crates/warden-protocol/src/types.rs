//! Core protocol types for the portal's authentication API.
//!
//! Every type here is a request or response body of one of the `/auth/*`
//! endpoints, or something embedded in one. The backend speaks camelCase
//! JSON, so all structs carry `#[serde(rename_all = "camelCase")]`.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::{codec, TokenError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A backend-assigned user identifier.
///
/// Newtype wrapper so a user id can't be confused with an email or any
/// other string. Serialized as the bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The role a portal account holds.
///
/// The wire names are `admin`, `clearingOfficer` and `student`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    ClearingOfficer,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::ClearingOfficer => "clearingOfficer",
            Role::Student => "student",
        };
        f.write_str(name)
    }
}

/// The last-known profile of the signed-in user.
///
/// Replaced wholesale on login and (when the backend returns one) on
/// refresh. Only the fields the session layer needs are typed; the rest
/// of the portal treats the profile as display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl UserProfile {
    /// `"First Last"`, as shown in dashboard headers.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// A short-lived bearer credential.
///
/// The token is opaque to this crate except for its `exp` claim, which
/// [`codec::expiry`] reads without checking the signature (that's the
/// server's job). Tokens are never mutated: a refresh produces a new one.
///
/// `Debug` is implemented by hand so a token never ends up in a log line
/// by accident.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw token string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the raw token string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// The value of an `Authorization` header carrying this token.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// The instant encoded in the token's `exp` claim.
    ///
    /// # Errors
    /// Returns [`TokenError::Malformed`] if the token can't be decoded.
    pub fn expiry(&self) -> Result<SystemTime, TokenError> {
        codec::expiry(&self.0)
    }

    /// Whether the token should be considered expired at `now`.
    ///
    /// A malformed token is always expired. See [`codec::is_expired`].
    pub fn is_expired(&self, now: SystemTime, skew: Duration) -> bool {
        codec::is_expired(&self.0, now, skew)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

impl From<String> for AccessToken {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// ---------------------------------------------------------------------------
// Endpoint bodies
// ---------------------------------------------------------------------------

/// `POST /auth/login` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// `POST /auth/login` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: AccessToken,
    pub user: UserProfile,
}

/// `POST /auth/register` request body.
///
/// Registration does not sign the new account in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// `POST /auth/register` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user: UserProfile,
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /auth/refresh-token` response body.
///
/// The refresh credential itself travels in an HTTP-only cookie and never
/// appears here. Some backend versions also return the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: AccessToken,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

/// A `{ "message": ... }` body, returned by logout and by most error
/// responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}
