//! Wire protocol for Warden.
//!
//! This crate defines what the session layer exchanges with the portal
//! backend, and how it reads the one piece of an access token it cares
//! about:
//!
//! - **Types** ([`AccessToken`], [`UserProfile`], [`LoginRequest`], etc.):
//!   the request and response bodies of the `/auth/*` endpoints.
//! - **Codec** ([`codec::expiry`], [`codec::is_expired`]): extracts the
//!   `exp` claim from a JWT without verifying its signature.
//! - **Errors** ([`TokenError`]): what can go wrong while decoding.
//!
//! # Architecture
//!
//! ```text
//! Transport (bytes) → Protocol (AccessToken, UserProfile) → Session (state machine)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod codec;
mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::TokenError;
pub use types::{
    AccessToken, LoginRequest, LoginResponse, MessageResponse,
    RefreshResponse, RegisterRequest, RegisterResponse, Role, UserId,
    UserProfile,
};
