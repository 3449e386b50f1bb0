//! The typed credential view over a [`KeyValueStore`].

use warden_protocol::{AccessToken, UserProfile};

use crate::{KeyValueStore, StoreError};

/// Key the raw access token is stored under.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Key the JSON-encoded user profile is stored under.
pub const USER_KEY: &str = "user";

/// What a previous process left behind.
///
/// Either field may be missing on its own: a crash between writes, or an
/// older client version, can leave a user without a token. Reconciling
/// that is the bootstrap's job, not the store's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<AccessToken>,
    pub user: Option<UserProfile>,
}

/// Durable storage of the current access token and last-known user.
///
/// This is the source of truth across restarts. It never triggers network
/// calls or session transitions; the session layer is responsible for
/// keeping its in-memory state consistent with what is written here.
///
/// Reads never fail: a backend error or an undecodable profile is logged
/// and reported as "nothing stored", which sends the session down the
/// same path as a fresh install.
#[derive(Debug)]
pub struct CredentialStore<S> {
    backend: S,
}

impl<S: KeyValueStore> CredentialStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Returns whatever is stored, or `None` if neither a token nor a user
    /// is present.
    pub fn get(&self) -> Option<StoredCredentials> {
        let access_token = self.access_token();
        let user = self.user();
        if access_token.is_none() && user.is_none() {
            return None;
        }
        Some(StoredCredentials { access_token, user })
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.read(ACCESS_TOKEN_KEY).map(AccessToken::from)
    }

    pub fn user(&self) -> Option<UserProfile> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "stored user profile is unreadable");
                None
            }
        }
    }

    /// Replaces both the token and the user in one batch.
    pub fn set(
        &self,
        access_token: &AccessToken,
        user: &UserProfile,
    ) -> Result<(), StoreError> {
        let user = serde_json::to_string(user)?;
        self.backend.set_many(vec![
            (ACCESS_TOKEN_KEY, access_token.as_str().to_string()),
            (USER_KEY, user),
        ])
    }

    /// Replaces only the user profile.
    pub fn set_user(&self, user: &UserProfile) -> Result<(), StoreError> {
        self.backend.set(USER_KEY, serde_json::to_string(user)?)
    }

    /// Replaces only the access token.
    pub fn set_token(&self, access_token: &AccessToken) -> Result<(), StoreError> {
        self.backend
            .set(ACCESS_TOKEN_KEY, access_token.as_str().to_string())
    }

    /// Removes both entries.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.backend.remove_many(&[ACCESS_TOKEN_KEY, USER_KEY])
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "credential read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use warden_protocol::{Role, UserId};

    use super::*;
    use crate::MemoryStore;

    fn user() -> UserProfile {
        UserProfile {
            id: UserId("u-1".into()),
            email: "s@uni.edu".into(),
            first_name: "Sam".into(),
            last_name: "Eze".into(),
            role: Role::Student,
            phone: None,
            department: Some("Physics".into()),
        }
    }

    fn store() -> CredentialStore<MemoryStore> {
        CredentialStore::new(MemoryStore::new())
    }

    #[test]
    fn test_get_empty_store_returns_none() {
        assert_eq!(store().get(), None);
    }

    #[test]
    fn test_set_then_get_returns_both() {
        let store = store();
        let token = AccessToken::new("a.b.c");
        store.set(&token, &user()).unwrap();

        let creds = store.get().expect("something stored");
        assert_eq!(creds.access_token, Some(token));
        assert_eq!(creds.user, Some(user()));
    }

    #[test]
    fn test_user_without_token_is_reported() {
        let store = store();
        store.set_user(&user()).unwrap();

        let creds = store.get().expect("user stored");
        assert_eq!(creds.access_token, None);
        assert_eq!(creds.user, Some(user()));
    }

    #[test]
    fn test_set_token_keeps_user() {
        let store = store();
        store.set(&AccessToken::new("old"), &user()).unwrap();
        store.set_token(&AccessToken::new("new")).unwrap();

        let creds = store.get().unwrap();
        assert_eq!(creds.access_token, Some(AccessToken::new("new")));
        assert_eq!(creds.user, Some(user()));
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = store();
        store.set(&AccessToken::new("t"), &user()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.get(), None);
        assert!(store.backend().is_empty());
    }

    #[test]
    fn test_unreadable_user_is_treated_as_absent() {
        let store = store();
        store.backend().set(USER_KEY, "{broken".into()).unwrap();
        assert_eq!(store.user(), None);
        assert_eq!(store.get(), None);
    }
}
