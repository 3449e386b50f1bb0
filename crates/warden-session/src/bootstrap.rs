//! Reconciling stored credentials into the session at process start.
//!
//! | Stored                         | Outcome                          |
//! |--------------------------------|----------------------------------|
//! | nothing                        | `Anonymous`                      |
//! | token, no user                 | store cleared, `Anonymous`       |
//! | user, valid token              | `Authenticated`                  |
//! | user, missing or expired token | refresh, then either of the two  |
//!
//! Whatever happens, the session ends up `initialized`. Nothing in here
//! returns an error: a garbage token left behind by a previous process is
//! a reason to show the login page, not to crash.

use std::time::SystemTime;

use warden_store::{KeyValueStore, StoredCredentials};

use crate::coordinator::{RefreshCoordinator, SessionCore};
use crate::AuthBackend;

/// Runs the reconciliation. Callers guarantee it runs once per session.
pub(crate) async fn restore<B: AuthBackend, S: KeyValueStore>(
    core: &SessionCore<B, S>,
    coordinator: &RefreshCoordinator<B, S>,
) {
    match core.cell.store().get() {
        None => {
            tracing::debug!("no stored credentials");
            core.cell.settle_anonymous(false);
        }
        Some(StoredCredentials { user: None, .. }) => {
            tracing::info!("stored token has no user, discarding it");
            core.cell.settle_anonymous(true);
        }
        Some(StoredCredentials {
            access_token: Some(token),
            user: Some(user),
        }) if !token.is_expired(SystemTime::now(), core.config.refresh_skew()) => {
            tracing::info!(user_id = %user.id, "session restored");
            core.cell.restore(token, user);
        }
        Some(StoredCredentials { user: Some(user), .. }) => {
            tracing::info!(user_id = %user.id, "stored token expired, refreshing");
            if let Err(e) = coordinator.refresh().await {
                tracing::info!(error = %e, "could not restore session");
                // The failed refresh has ended the session already. This
                // only matters if it was superseded.
                core.cell.settle_anonymous(true);
            }
        }
    }

    core.cell.mark_initialized();
}
