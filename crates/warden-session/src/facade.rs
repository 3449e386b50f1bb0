//! The public surface of the session layer.

use std::sync::Arc;

use tokio::sync::{watch, OnceCell};
use warden_protocol::{AccessToken, LoginRequest, RegisterRequest, UserProfile};
use warden_store::{CredentialStore, KeyValueStore};

use crate::bootstrap;
use crate::coordinator::{RefreshCoordinator, SessionCore};
use crate::navigator::{Navigator, Redirector, LOGGED_OUT_MESSAGE};
use crate::state::{SessionCell, SessionSnapshot};
use crate::{AuthBackend, SessionConfig, SessionError};

/// Login, logout, and the observable session state.
///
/// One facade per process. It owns the session state, the credential store,
/// and the [`RefreshCoordinator`] that the request and response gates
/// share.
///
/// ```rust,ignore
/// let session = SessionFacade::new(backend, FileStore::open(path)?, SessionConfig::default());
/// session.bootstrap().await;
/// if !session.is_authenticated() {
///     session.login("ada@uni.edu", "hunter2").await?;
/// }
/// ```
pub struct SessionFacade<B, S> {
    core: Arc<SessionCore<B, S>>,
    coordinator: RefreshCoordinator<B, S>,
    bootstrapped: OnceCell<()>,
}

impl<B: AuthBackend, S: KeyValueStore> SessionFacade<B, S> {
    pub fn new(backend: B, store: S, config: SessionConfig) -> Self {
        let core = Arc::new(SessionCore {
            backend,
            cell: SessionCell::new(CredentialStore::new(store)),
            redirector: Redirector::new(),
            config,
        });
        Self {
            coordinator: RefreshCoordinator::new(Arc::clone(&core)),
            core,
            bootstrapped: OnceCell::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Wiring
    // -----------------------------------------------------------------------

    /// The coordinator to hand to the request and response gates.
    pub fn coordinator(&self) -> &RefreshCoordinator<B, S> {
        &self.coordinator
    }

    pub fn config(&self) -> &SessionConfig {
        &self.core.config
    }

    pub fn backend(&self) -> &B {
        &self.core.backend
    }

    /// Read access to the durable credentials. All writes go through the
    /// session.
    pub fn credentials(&self) -> &CredentialStore<S> {
        self.core.cell.store()
    }

    pub fn redirector(&self) -> &Redirector {
        &self.core.redirector
    }

    /// Installs the UI's navigator. Redirects before this are skipped.
    pub fn register_navigator(&self, navigator: Arc<dyn Navigator>) {
        self.core.redirector.register(navigator);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Restores the previous session from storage, refreshing it if its
    /// token has expired.
    ///
    /// Runs once. Concurrent and later calls wait for that run and return.
    /// Afterwards [`is_initialized`](Self::is_initialized) is true.
    pub async fn bootstrap(&self) {
        self.bootstrapped
            .get_or_init(|| bootstrap::restore(&self.core, &self.coordinator))
            .await;
    }

    /// Signs in. On failure nothing is written and the state is untouched.
    ///
    /// # Errors
    /// [`SessionError::Login`] if the backend refuses or can't be reached,
    /// [`SessionError::Store`] if the credentials can't be persisted.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, SessionError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .core
            .backend
            .login(&request)
            .await
            .map_err(SessionError::Login)?;

        let user = response.user;
        self.core.cell.sign_in(response.access_token, user.clone())?;
        tracing::info!(user_id = %user.id, role = %user.role, "signed in");
        Ok(user)
    }

    /// Signs out. Always succeeds locally.
    ///
    /// The backend is told first, bounded by
    /// [`logout_timeout`](SessionConfig::logout_timeout); if that fails or
    /// times out it is only logged. Then the stored credentials are
    /// cleared, the session becomes anonymous, and the user is sent to the
    /// login page.
    pub async fn logout(&self) {
        let token = self
            .core
            .cell
            .current_token()
            .or_else(|| self.core.cell.store().access_token());
        let timeout = self.core.config.logout_timeout();

        match tokio::time::timeout(timeout, self.core.backend.logout(token.as_ref())).await {
            Ok(Ok(())) => tracing::debug!("server-side logout confirmed"),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "server-side logout failed, signing out locally");
            }
            Err(_) => {
                tracing::warn!(?timeout, "server-side logout timed out, signing out locally");
            }
        }

        self.core.cell.sign_out();
        tracing::info!("signed out");
        self.core.redirector.redirect_to_login(LOGGED_OUT_MESSAGE, false);
    }

    /// Creates an account. Does not sign it in.
    pub async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<UserProfile, SessionError> {
        let response = self
            .core
            .backend
            .register(request)
            .await
            .map_err(SessionError::Register)?;
        tracing::info!(user_id = %response.user.id, "account registered");
        Ok(response.user)
    }

    /// Replaces the signed-in user's profile, in memory and in storage.
    ///
    /// # Errors
    /// [`SessionError::NotAuthenticated`] if nobody is signed in.
    pub fn update_profile(&self, user: UserProfile) -> Result<(), SessionError> {
        if self.core.cell.update_user(user)? {
            Ok(())
        } else {
            Err(SessionError::NotAuthenticated)
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn current_user(&self) -> Option<UserProfile> {
        self.core.cell.snapshot().user().cloned()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.core.cell.current_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.cell.snapshot().is_authenticated()
    }

    /// Whether bootstrap has settled. Protected content should wait for it.
    pub fn is_initialized(&self) -> bool {
        self.core.cell.snapshot().initialized
    }

    pub fn is_refreshing(&self) -> bool {
        self.core.cell.snapshot().refreshing
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.core.cell.snapshot()
    }

    /// A receiver that sees every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.core.cell.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parking_lot::Mutex;
    use warden_protocol::testing::token_expired_for;
    use warden_protocol::Role;
    use warden_store::MemoryStore;

    use super::*;
    use crate::state::SessionState;
    use crate::testing::{user, RefreshScript, ScriptedBackend, PASSWORD};
    use crate::RefreshError;

    type Redirects = Arc<Mutex<Vec<(String, bool)>>>;

    fn facade() -> (Arc<SessionFacade<ScriptedBackend, MemoryStore>>, Redirects) {
        let facade = SessionFacade::new(
            ScriptedBackend::new(),
            MemoryStore::new(),
            SessionConfig::default(),
        );
        let redirects: Redirects = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&redirects);
        facade.register_navigator(Arc::new(move |m: &str, e: bool| {
            sink.lock().push((m.to_string(), e));
        }));
        (Arc::new(facade), redirects)
    }

    #[tokio::test]
    async fn test_login_success_stores_and_authenticates() {
        let (facade, _) = facade();

        let profile = facade.login("ada@uni.edu", PASSWORD).await.unwrap();

        assert_eq!(profile, user("ada"));
        assert!(facade.is_authenticated());
        let stored = facade.credentials().get().unwrap();
        assert_eq!(stored.user, Some(user("ada")));
        assert_eq!(stored.access_token, facade.access_token());
    }

    #[tokio::test]
    async fn test_login_rejected_leaves_state_untouched() {
        let (facade, _) = facade();
        facade.bootstrap().await;

        let err = facade.login("ada@uni.edu", "wrong").await.unwrap_err();

        assert!(matches!(err, SessionError::Login(ref e) if e.is_auth_failure()));
        assert_eq!(facade.snapshot().state, SessionState::Anonymous);
        assert_eq!(facade.credentials().get(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_session_and_redirects() {
        let (facade, redirects) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();

        facade.logout().await;

        assert_eq!(facade.backend().logout_calls(), 1);
        assert_eq!(facade.snapshot().state, SessionState::Anonymous);
        assert_eq!(facade.credentials().get(), None);
        assert_eq!(
            *redirects.lock(),
            vec![(LOGGED_OUT_MESSAGE.to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_logout_server_failure_still_signs_out() {
        let (facade, _) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();
        facade.backend().fail_logouts();

        facade.logout().await;

        assert!(!facade.is_authenticated());
        assert_eq!(facade.snapshot().state, SessionState::Anonymous);
        assert_eq!(facade.credentials().get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_server_hang_times_out_and_signs_out() {
        let (facade, _) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();
        facade.backend().hold_logouts();

        let started = tokio::time::Instant::now();
        facade.logout().await;

        assert!(started.elapsed() >= Duration::from_secs(5));
        assert_eq!(facade.snapshot().state, SessionState::Anonymous);
        assert_eq!(facade.credentials().get(), None);
    }

    #[tokio::test]
    async fn test_logout_during_refresh_discards_refresh_result() {
        let (facade, _) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();
        facade.backend().hold_refreshes();

        let pending = tokio::spawn(facade.coordinator().refresh());
        tokio::task::yield_now().await;
        assert!(facade.is_refreshing());

        facade.logout().await;
        facade.backend().release_refreshes();
        let outcome = pending.await.unwrap();

        assert!(matches!(outcome, Err(RefreshError::Superseded)));
        assert!(!facade.is_authenticated());
        assert!(!facade.is_refreshing());
        assert_eq!(facade.credentials().get(), None);
    }

    #[tokio::test]
    async fn test_logout_right_after_refresh_starts_stays_logged_out() {
        let (facade, redirects) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();
        facade
            .backend()
            .script_refresh(RefreshScript::SucceedWithUser(user("ada")));

        let pending = tokio::spawn(facade.coordinator().refresh());
        facade.logout().await;
        let outcome = pending.await.unwrap();

        assert!(matches!(outcome, Err(RefreshError::Superseded)));
        assert!(!facade.is_authenticated());
        assert_eq!(facade.credentials().get(), None);
        assert_eq!(
            *redirects.lock(),
            vec![(LOGGED_OUT_MESSAGE.to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_login_during_refresh_wins_over_refresh_result() {
        let (facade, _) = facade();
        facade
            .credentials()
            .set(&token_expired_for("old", 60), &user("old"))
            .unwrap();
        facade.backend().hold_refreshes();

        let pending = tokio::spawn(facade.coordinator().refresh());
        tokio::task::yield_now().await;
        facade.login("new@uni.edu", PASSWORD).await.unwrap();
        facade.backend().release_refreshes();

        let token = pending.await.unwrap().unwrap();

        assert_eq!(facade.current_user(), Some(user("new")));
        assert_eq!(Some(token), facade.access_token());
    }

    #[tokio::test]
    async fn test_register_does_not_sign_in() {
        let (facade, _) = facade();
        facade.bootstrap().await;

        let profile = facade
            .register(&RegisterRequest {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@uni.edu".into(),
                password: PASSWORD.into(),
                role: Role::ClearingOfficer,
                phone: None,
                department: None,
            })
            .await
            .unwrap();

        assert_eq!(profile.role, Role::ClearingOfficer);
        assert_eq!(facade.backend().register_calls(), 1);
        assert!(!facade.is_authenticated());
        assert_eq!(facade.credentials().get(), None);
    }

    #[tokio::test]
    async fn test_update_profile_anonymous_is_rejected() {
        let (facade, _) = facade();
        let err = facade.update_profile(user("ada")).unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user_everywhere() {
        let (facade, _) = facade();
        facade.login("ada@uni.edu", PASSWORD).await.unwrap();
        let mut changed = user("ada");
        changed.department = Some("Mathematics".into());

        facade.update_profile(changed.clone()).unwrap();

        assert_eq!(facade.current_user(), Some(changed.clone()));
        assert_eq!(facade.credentials().user(), Some(changed));
    }
}
