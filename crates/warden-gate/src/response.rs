//! Recovering from authentication failures with one refresh-and-retry.

use std::time::SystemTime;

use warden_protocol::AccessToken;
use warden_session::{AuthBackend, RefreshCoordinator};
use warden_store::KeyValueStore;
use warden_transport::{
    BoxFuture, Interceptor, Response, ResponseContext, TransportError, AUTHORIZATION,
};

/// `after_response` interceptor that retries a 401/403 once with a fresh
/// token.
///
/// ```text
/// 401/403 on a protected path, not yet retried, user known
///     → refresh (shared) → mark retried → resubmit through the pipeline
/// anything else
///     → passed through untouched
/// ```
///
/// The retried marker travels on the request itself, so a resource that
/// keeps rejecting a freshly refreshed token is retried exactly once and
/// then its 401 reaches the caller.
pub struct ResponseGate<B, S> {
    coordinator: RefreshCoordinator<B, S>,
}

impl<B: AuthBackend, S: KeyValueStore> ResponseGate<B, S> {
    pub fn new(coordinator: RefreshCoordinator<B, S>) -> Self {
        Self { coordinator }
    }

    async fn recover(
        &self,
        ctx: ResponseContext<'_>,
    ) -> Result<Response, TransportError> {
        let ResponseContext {
            request,
            outcome,
            client,
        } = ctx;

        let response = match outcome {
            Ok(response) if response.is_auth_failure() => response,
            // Transport errors and non-auth statuses are the caller's.
            other => return other,
        };

        let path = request.route();
        if self.coordinator.config().is_auth_path(path) {
            return Ok(response);
        }
        if request.is_retried() {
            tracing::debug!(
                path,
                status = response.status(),
                "rejected again after refresh, giving up"
            );
            return Ok(response);
        }
        if !self.coordinator.has_user() {
            return Ok(response);
        }

        let token = match self.usable_token(request.bearer_token()) {
            Some(token) => token,
            None => match self.coordinator.refresh().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::debug!(path, error = %e, "refresh failed, not retrying");
                    return Ok(response);
                }
            },
        };

        let mut retry = request.clone();
        retry.mark_retried();
        retry.set_header(AUTHORIZATION, token.bearer());
        tracing::debug!(path, status = response.status(), "retrying with refreshed token");
        client.resubmit(retry).await
    }

    /// A token newer than the one the request was rejected with, if the
    /// session already has one. Saves a refresh when several requests were
    /// rejected by the same old token.
    fn usable_token(&self, sent: Option<&str>) -> Option<AccessToken> {
        let current = self.coordinator.current_token()?;
        let skew = self.coordinator.config().refresh_skew();
        let is_newer = sent.is_some_and(|sent| sent != current.as_str());
        (is_newer && !current.is_expired(SystemTime::now(), skew)).then_some(current)
    }
}

impl<B: AuthBackend, S: KeyValueStore> Interceptor for ResponseGate<B, S> {
    fn after_response<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
    ) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(self.recover(ctx))
    }
}
