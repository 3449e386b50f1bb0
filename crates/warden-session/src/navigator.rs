//! Navigation to the login page.
//!
//! The session layer has to send the user to the login page on logout and
//! when a session can't be refreshed, but it knows nothing about routers.
//! The UI registers a [`Navigator`] at start-up; until it does, redirects
//! are silently skipped.

use std::sync::Arc;

use parking_lot::RwLock;

/// Shown after a refresh failure ends the session.
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Your session has expired. Please log in again.";
/// Shown after an explicit logout.
pub const LOGGED_OUT_MESSAGE: &str = "You have been logged out.";

/// Imperative navigation to the login page.
///
/// Implemented by the UI layer. Closures of the right shape implement it
/// too, which keeps tests short:
///
/// ```rust
/// use std::sync::Arc;
/// use warden_session::{Navigator, Redirector};
///
/// let redirector = Redirector::new();
/// redirector.register(Arc::new(|message: &str, is_error: bool| {
///     println!("login page: {message} (error: {is_error})");
/// }));
/// redirector.redirect_to_login("bye", false);
/// ```
pub trait Navigator: Send + Sync + 'static {
    /// Navigates to the login page, showing `message`. `is_error` selects
    /// error styling for the message.
    fn redirect_to_login(&self, message: &str, is_error: bool);
}

impl<F> Navigator for F
where
    F: Fn(&str, bool) + Send + Sync + 'static,
{
    fn redirect_to_login(&self, message: &str, is_error: bool) {
        self(message, is_error)
    }
}

/// A slot for the registered [`Navigator`], with a no-op fallback.
#[derive(Default)]
pub struct Redirector {
    navigator: RwLock<Option<Arc<dyn Navigator>>>,
}

impl Redirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `navigator`, replacing any previous one.
    pub fn register(&self, navigator: Arc<dyn Navigator>) {
        *self.navigator.write() = Some(navigator);
    }

    /// Removes the installed navigator, if any.
    pub fn unregister(&self) {
        self.navigator.write().take();
    }

    pub fn is_registered(&self) -> bool {
        self.navigator.read().is_some()
    }

    /// Forwards to the registered navigator, or does nothing.
    pub fn redirect_to_login(&self, message: &str, is_error: bool) {
        // Clone out of the lock so a navigator that re-enters the session
        // layer can't deadlock on it.
        let navigator = self.navigator.read().clone();
        match navigator {
            Some(navigator) => navigator.redirect_to_login(message, is_error),
            None => {
                tracing::debug!(message, "no navigator registered, redirect skipped");
            }
        }
    }
}

impl std::fmt::Debug for Redirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Redirector")
            .field("registered", &self.is_registered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn test_redirect_without_navigator_is_noop() {
        let redirector = Redirector::new();
        redirector.redirect_to_login("anything", true);
        assert!(!redirector.is_registered());
    }

    #[test]
    fn test_redirect_forwards_to_registered_navigator() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let redirector = Redirector::new();
        redirector.register(Arc::new(move |m: &str, e: bool| {
            sink.lock().push((m.to_string(), e));
        }));

        redirector.redirect_to_login(LOGGED_OUT_MESSAGE, false);

        assert_eq!(
            *seen.lock(),
            vec![(LOGGED_OUT_MESSAGE.to_string(), false)]
        );
    }

    #[test]
    fn test_unregister_restores_noop() {
        let redirector = Redirector::new();
        redirector.register(Arc::new(|_: &str, _: bool| {
            panic!("should not be called");
        }));
        redirector.unregister();
        redirector.redirect_to_login("x", true);
    }
}
