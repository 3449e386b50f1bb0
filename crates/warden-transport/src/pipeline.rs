//! Interceptor pipeline: a client wrapper with request/response hooks.
//!
//! Every request sent through a [`Pipeline`] runs through each registered
//! [`Interceptor`] twice:
//!
//! ```text
//! before_request (in registration order)
//!         │
//!         ▼
//!   inner client send
//!         │
//!         ▼
//! after_response (in registration order)
//! ```
//!
//! An `after_response` hook may resubmit the original request through the
//! whole pipeline again via [`ResponseContext::client`]. The pipeline
//! itself never retries; it is up to the interceptor to bound that with
//! [`Request::mark_retried`].
//!
//! # Registration lifetime
//!
//! [`Pipeline::register`] hands back a [`Registration`] guard. Dropping the
//! guard removes the interceptor, so whoever installs an interceptor also
//! owns its teardown, and a shut-down session can't keep rewriting requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures_util::future::BoxFuture;
use parking_lot::RwLock;

use crate::{HttpClient, Request, Response, TransportError};

type Chain = Vec<(u64, Arc<dyn Interceptor>)>;

/// Hooks run around every request sent through a [`Pipeline`].
///
/// Both hooks have pass-through defaults, so an interceptor only
/// overrides the side it cares about.
///
/// The hooks return [`BoxFuture`] rather than using `async fn` so the
/// pipeline can store interceptors of different types side by side as
/// `Arc<dyn Interceptor>`.
pub trait Interceptor: Send + Sync + 'static {
    /// Called before `request` leaves the process. Returns the request to
    /// send, possibly with extra headers.
    fn before_request<'a>(&'a self, request: Request) -> BoxFuture<'a, Request> {
        Box::pin(async move { request })
    }

    /// Called with the outcome of a request. Returns the outcome to hand to
    /// the next interceptor (and eventually the caller).
    fn after_response<'a>(
        &'a self,
        ctx: ResponseContext<'a>,
    ) -> BoxFuture<'a, Result<Response, TransportError>> {
        Box::pin(async move { ctx.outcome })
    }
}

/// Sends a request back through a full pipeline.
pub trait Resubmit: Send + Sync {
    fn resubmit(
        &self,
        request: Request,
    ) -> BoxFuture<'_, Result<Response, TransportError>>;
}

/// Everything an `after_response` hook gets to look at.
pub struct ResponseContext<'a> {
    /// The request as it was sent (after every `before_request` hook).
    pub request: &'a Request,
    /// The response, or the transport failure.
    pub outcome: Result<Response, TransportError>,
    /// The pipeline that sent the request, for resubmission.
    pub client: &'a dyn Resubmit,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// An [`HttpClient`] that runs registered interceptors around an inner
/// client.
pub struct Pipeline<C> {
    inner: C,
    chain: Arc<RwLock<Chain>>,
    next_id: AtomicU64,
}

impl<C: HttpClient> Pipeline<C> {
    /// Wraps `inner` with an empty interceptor chain.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            chain: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// The wrapped client. Requests sent through it bypass every
    /// interceptor.
    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Appends `interceptor` to the chain.
    ///
    /// The interceptor stays installed until the returned guard is dropped.
    pub fn register(&self, interceptor: Arc<dyn Interceptor>) -> Registration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.chain.write().push((id, interceptor));
        tracing::debug!(interceptor_id = id, "interceptor registered");
        Registration {
            id,
            chain: Arc::downgrade(&self.chain),
        }
    }

    /// Number of interceptors currently installed.
    pub fn interceptor_count(&self) -> usize {
        self.chain.read().len()
    }

    fn dispatch(
        &self,
        mut request: Request,
    ) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(async move {
            // Snapshot the chain so no lock is held across an await, and
            // a registration dropped mid-request doesn't shift indices.
            let chain: Vec<Arc<dyn Interceptor>> = self
                .chain
                .read()
                .iter()
                .map(|(_, i)| Arc::clone(i))
                .collect();

            for interceptor in &chain {
                request = interceptor.before_request(request).await;
            }

            tracing::trace!(
                method = %request.method(),
                path = request.path(),
                "sending request"
            );
            let mut outcome = self.inner.send(request.clone()).await;

            for interceptor in &chain {
                outcome = interceptor
                    .after_response(ResponseContext {
                        request: &request,
                        outcome,
                        client: self,
                    })
                    .await;
            }

            outcome
        })
    }
}

impl<C: HttpClient> HttpClient for Pipeline<C> {
    fn send(
        &self,
        request: Request,
    ) -> impl std::future::Future<Output = Result<Response, TransportError>> + Send
    {
        self.dispatch(request)
    }
}

impl<C: HttpClient> Resubmit for Pipeline<C> {
    fn resubmit(
        &self,
        request: Request,
    ) -> BoxFuture<'_, Result<Response, TransportError>> {
        self.dispatch(request)
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Keeps an interceptor installed. Dropping it deregisters the interceptor.
///
/// The guard only holds a weak reference to the pipeline's chain, so it
/// does not keep a dropped pipeline alive.
#[must_use = "dropping a Registration immediately removes the interceptor"]
pub struct Registration {
    id: u64,
    chain: Weak<RwLock<Chain>>,
}

impl Registration {
    /// The pipeline-local id of the interceptor this guard owns.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(chain) = self.chain.upgrade() {
            chain.write().retain(|(id, _)| *id != self.id);
            tracing::debug!(interceptor_id = self.id, "interceptor removed");
        }
    }
}
