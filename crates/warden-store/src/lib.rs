//! Durable credential storage for Warden.
//!
//! Two layers:
//!
//! 1. **Key-value backends** ([`KeyValueStore`]): synchronous string
//!    storage that survives a restart ([`FileStore`]) or doesn't
//!    ([`MemoryStore`]).
//! 2. **Credentials** ([`CredentialStore`]): the typed view the session
//!    layer uses: the current access token and the last-known user.
//!
//! Nothing in this crate makes network calls or changes session state.
//! The session layer decides when to write; this crate only remembers.

mod credentials;
mod error;
mod file;
mod kv;
mod memory;

pub use credentials::{
    CredentialStore, StoredCredentials, ACCESS_TOKEN_KEY, USER_KEY,
};
pub use error::StoreError;
pub use file::FileStore;
pub use kv::KeyValueStore;
pub use memory::MemoryStore;
