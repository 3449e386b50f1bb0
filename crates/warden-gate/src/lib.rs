//! Interceptors that keep Warden access tokens fresh.
//!
//! Two gates sit on an interceptor [`Pipeline`]:
//!
//! - [`RequestGate`] attaches the bearer token, refreshing it first when it
//!   has expired.
//! - [`ResponseGate`] answers a 401/403 by refreshing and resubmitting the
//!   request once.
//!
//! Both share the session's [`RefreshCoordinator`], so however many
//! requests need a new token at once, the backend sees one refresh call.
//! Paths listed in [`SessionConfig::auth_paths`](warden_session::SessionConfig)
//! pass through both gates untouched.

mod request;
mod response;

pub use request::RequestGate;
pub use response::ResponseGate;

use std::sync::Arc;

use warden_session::{AuthBackend, RefreshCoordinator};
use warden_store::KeyValueStore;
use warden_transport::{HttpClient, Pipeline, Registration};

/// The two gates installed on a pipeline. Dropping this removes them.
#[must_use = "dropping GateRegistrations immediately removes the gates"]
pub struct GateRegistrations {
    request: Registration,
    response: Registration,
}

impl GateRegistrations {
    /// Interceptor ids of the request and response gate, in that order.
    pub fn ids(&self) -> (u64, u64) {
        (self.request.id(), self.response.id())
    }
}

/// Registers a [`RequestGate`] and a [`ResponseGate`] on `pipeline`.
pub fn install<C, B, S>(
    pipeline: &Pipeline<C>,
    coordinator: &RefreshCoordinator<B, S>,
) -> GateRegistrations
where
    C: HttpClient,
    B: AuthBackend,
    S: KeyValueStore,
{
    let request = pipeline.register(Arc::new(RequestGate::new(coordinator.clone())));
    let response = pipeline.register(Arc::new(ResponseGate::new(coordinator.clone())));
    tracing::debug!("session gates installed");
    GateRegistrations { request, response }
}
