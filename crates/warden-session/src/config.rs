//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH};

/// Configuration for session behavior.
///
/// Sensible defaults are provided; override individual fields with struct
/// update syntax:
///
/// ```rust
/// use warden_session::SessionConfig;
///
/// let config = SessionConfig {
///     refresh_skew_secs: 30,
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.refresh_timeout_secs, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// How many seconds before its `exp` a token already counts as
    /// expired. A refresh then starts before the server would reject the
    /// token instead of after.
    ///
    /// Default: 10 seconds. Set to 0 to only refresh on the exact expiry.
    pub refresh_skew_secs: u64,

    /// Upper bound on one refresh call. A refresh that takes longer is
    /// treated exactly like a rejected one, so no request can hang behind
    /// a dead network path.
    ///
    /// Default: 10 seconds.
    pub refresh_timeout_secs: u64,

    /// Upper bound on the server-side part of logout. Local cleanup
    /// happens either way.
    ///
    /// Default: 5 seconds.
    pub logout_timeout_secs: u64,

    /// Request paths that negotiate the credential themselves and are
    /// exempt from token injection and refresh-retry. Matched against the
    /// request path without its query string.
    pub auth_paths: Vec<String>,
}

impl SessionConfig {
    pub fn refresh_skew(&self) -> Duration {
        Duration::from_secs(self.refresh_skew_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn logout_timeout(&self) -> Duration {
        Duration::from_secs(self.logout_timeout_secs)
    }

    /// Whether `route` is one of the [`auth_paths`](Self::auth_paths).
    pub fn is_auth_path(&self, route: &str) -> bool {
        let route = route.trim_end_matches('/');
        self.auth_paths
            .iter()
            .any(|p| p.trim_end_matches('/') == route)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_skew_secs: 10,
            refresh_timeout_secs: 10,
            logout_timeout_secs: 5,
            auth_paths: [LOGIN_PATH, REGISTER_PATH, REFRESH_PATH, LOGOUT_PATH]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
