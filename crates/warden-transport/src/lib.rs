//! Transport abstraction layer for Warden.
//!
//! Provides the [`HttpClient`] trait that the session layer sends requests
//! through, the [`Request`]/[`Response`] values it exchanges, and a
//! [`Pipeline`] that wraps any client with interceptors.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): HTTP transport via `reqwest`, with a cookie
//!   jar so HTTP-only refresh cookies are carried between calls.

mod error;
mod message;
mod pipeline;
#[cfg(feature = "reqwest")]
mod reqwest_client;

pub use error::TransportError;
pub use message::{Method, Request, Response, AUTHORIZATION};
pub use pipeline::{
    Interceptor, Pipeline, Registration, Resubmit, ResponseContext,
};
#[cfg(feature = "reqwest")]
pub use reqwest_client::ReqwestClient;

pub use futures_util::future::BoxFuture;

use std::future::Future;
use std::sync::Arc;

/// Sends a request and waits for the response.
///
/// Implementations only fail with a [`TransportError`] when no HTTP
/// response was received. A 4xx/5xx answer is still `Ok(Response)`.
///
/// # Trait bounds
///
/// - `Send + Sync` → one client is shared by every task that makes
///   requests.
/// - `'static` → clients are stored inside long-lived session objects.
pub trait HttpClient: Send + Sync + 'static {
    /// Sends `request` to the remote server.
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<T: HttpClient> HttpClient for Arc<T> {
    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).send(request)
    }
}
