//! # Warden
//!
//! Session and access-token lifecycle for clients of a portal API.
//!
//! Warden keeps a short-lived access token fresh across any number of
//! concurrent requests: it sends at most one refresh at a time, never lets
//! a request retry forever against a backend that keeps rejecting it, and
//! restores the previous session when the process starts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::prelude::*;
//!
//! # async fn run() -> Result<(), WardenError> {
//! let client = ClientBuilder::new()
//!     .base_url("https://portal.example.edu/api")
//!     .store(FileStore::open("session.json")?)
//!     .build()?;
//!
//! client.bootstrap().await;
//! if !client.session().is_authenticated() {
//!     client.session().login("ada@uni.edu", "hunter2").await?;
//! }
//! let students: serde_json::Value = client.get_json("/students").await?;
//! # let _ = students;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
pub mod telemetry;

pub use client::{Client, ClientBuilder, Session};
pub use error::WardenError;

// Re-export the sub-crates for users who need the lower layers.
pub use warden_gate as gate;
pub use warden_protocol as protocol;
pub use warden_session as session;
pub use warden_store as store;
pub use warden_transport as transport;

/// Everything most applications need.
pub mod prelude {
    pub use crate::{Client, ClientBuilder, WardenError};
    pub use warden_protocol::{AccessToken, Role, UserProfile};
    pub use warden_session::{Navigator, SessionConfig, SessionSnapshot, SessionState};
    pub use warden_store::{FileStore, KeyValueStore, MemoryStore};
    pub use warden_transport::{Method, Request, Response};
}
