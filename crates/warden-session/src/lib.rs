//! Session lifecycle for Warden.
//!
//! This crate keeps track of who is signed in and keeps their access token
//! usable:
//!
//! - [`SessionFacade`]: login, logout, registration, and the observable
//!   [`SessionSnapshot`].
//! - [`RefreshCoordinator`]: at most one token refresh in flight, shared by
//!   every caller that needs one.
//! - [`AuthBackend`]: the portal's `/auth/*` endpoints, with
//!   [`HttpAuthBackend`] as the HTTP implementation.
//! - [`Navigator`]: how the session sends the user back to the login page.
//!
//! # Architecture
//!
//! ```text
//! SessionFacade ──owns──→ SessionCore { backend, state + store, redirector }
//!       │                        ↑
//!       └──hands out──→ RefreshCoordinator ──→ gates in warden-gate
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod backend;
mod bootstrap;
mod config;
mod coordinator;
mod error;
mod facade;
mod navigator;
mod state;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use backend::{AuthBackend, HttpAuthBackend};
pub use config::SessionConfig;
pub use coordinator::RefreshCoordinator;
pub use error::{BackendError, RefreshError, SessionError};
pub use facade::SessionFacade;
pub use navigator::{Navigator, Redirector, LOGGED_OUT_MESSAGE, SESSION_EXPIRED_MESSAGE};
pub use state::{SessionSnapshot, SessionState};
