//! Attaching the access token to outbound requests.

use std::time::SystemTime;

use warden_session::{AuthBackend, RefreshCoordinator};
use warden_store::KeyValueStore;
use warden_transport::{BoxFuture, Interceptor, Request, AUTHORIZATION};

/// `before_request` interceptor that adds `Authorization: Bearer <token>`.
///
/// If the stored token is expired (or will be within the configured skew),
/// the request waits for a refresh first. Many requests noticing the same
/// expired token share one refresh through the [`RefreshCoordinator`].
///
/// A failed refresh does not hold the request back: it goes out without a
/// token and the server's 401 takes its normal course. The gate itself
/// never changes the session.
pub struct RequestGate<B, S> {
    coordinator: RefreshCoordinator<B, S>,
}

impl<B: AuthBackend, S: KeyValueStore> RequestGate<B, S> {
    pub fn new(coordinator: RefreshCoordinator<B, S>) -> Self {
        Self { coordinator }
    }

    async fn authorize(&self, mut request: Request) -> Request {
        let config = self.coordinator.config();
        if config.is_auth_path(request.route()) {
            return request;
        }

        let Some(token) = self.coordinator.current_token() else {
            return request;
        };

        let token = if token.is_expired(SystemTime::now(), config.refresh_skew()) {
            tracing::debug!(path = request.route(), "access token expired, refreshing first");
            match self.coordinator.refresh().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::debug!(
                        path = request.route(),
                        error = %e,
                        "refresh failed, sending without a token"
                    );
                    request.remove_header(AUTHORIZATION);
                    return request;
                }
            }
        } else {
            token
        };

        request.set_header(AUTHORIZATION, token.bearer());
        request
    }
}

impl<B: AuthBackend, S: KeyValueStore> Interceptor for RequestGate<B, S> {
    fn before_request<'a>(&'a self, request: Request) -> BoxFuture<'a, Request> {
        Box::pin(self.authorize(request))
    }
}
