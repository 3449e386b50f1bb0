//! `Client` builder and request helpers.
//!
//! This is the entry point for applications. It ties the layers together:
//! transport → pipeline + gates → session → store.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use warden_gate::GateRegistrations;
use warden_session::{HttpAuthBackend, Navigator, SessionConfig, SessionFacade};
use warden_store::{KeyValueStore, MemoryStore};
use warden_transport::{HttpClient, Pipeline, Request, Response};

use crate::WardenError;

/// The session type a [`Client`] over `C` and `S` exposes.
pub type Session<C, S> = SessionFacade<HttpAuthBackend<C>, S>;

/// Builder for configuring a [`Client`].
///
/// # Example
///
/// ```rust,ignore
/// use warden::prelude::*;
///
/// let client = ClientBuilder::new()
///     .base_url("https://portal.example.edu/api")
///     .store(FileStore::open("session.json")?)
///     .navigator(Arc::new(|message: &str, _is_error: bool| eprintln!("{message}")))
///     .build()?;
/// client.bootstrap().await;
/// ```
pub struct ClientBuilder<S = MemoryStore> {
    base_url: String,
    session_config: SessionConfig,
    store: S,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ClientBuilder<MemoryStore> {
    /// Creates a builder with default settings and an in-memory store.
    pub fn new() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            session_config: SessionConfig::default(),
            store: MemoryStore::new(),
            navigator: None,
        }
    }
}

impl Default for ClientBuilder<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: KeyValueStore> ClientBuilder<S> {
    /// Sets the API root every request path is appended to.
    pub fn base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Sets where credentials are persisted between runs.
    pub fn store<T: KeyValueStore>(self, store: T) -> ClientBuilder<T> {
        ClientBuilder {
            base_url: self.base_url,
            session_config: self.session_config,
            store,
            navigator: self.navigator,
        }
    }

    /// Sets how the user is sent to the login page.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Builds a client that talks HTTP to the configured base URL.
    #[cfg(feature = "reqwest")]
    pub fn build(self) -> Result<Client<warden_transport::ReqwestClient, S>, WardenError> {
        let http = warden_transport::ReqwestClient::new(&self.base_url)?;
        Ok(self.build_with(http))
    }

    /// Builds a client over any [`HttpClient`]. The base URL is ignored;
    /// `http` decides where requests go.
    pub fn build_with<C: HttpClient + Clone>(self, http: C) -> Client<C, S> {
        let session = Arc::new(SessionFacade::new(
            HttpAuthBackend::new(http.clone()),
            self.store,
            self.session_config,
        ));
        if let Some(navigator) = self.navigator {
            session.register_navigator(navigator);
        }

        let pipeline = Pipeline::new(http);
        let gates = warden_gate::install(&pipeline, session.coordinator());
        tracing::info!("warden client ready");

        Client {
            session,
            pipeline,
            gates: Mutex::new(Some(gates)),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An API client whose requests carry a fresh access token.
///
/// Requests sent through [`send`](Self::send) and the JSON helpers pass
/// the session gates: the token is attached, refreshed when expired, and a
/// 401/403 is retried once after a refresh.
pub struct Client<C, S> {
    session: Arc<Session<C, S>>,
    pipeline: Pipeline<C>,
    gates: Mutex<Option<GateRegistrations>>,
}

impl<C: HttpClient + Clone, S: KeyValueStore> Client<C, S> {
    /// The session: login, logout, and state.
    pub fn session(&self) -> &Arc<Session<C, S>> {
        &self.session
    }

    /// The interceptor pipeline requests go through.
    pub fn pipeline(&self) -> &Pipeline<C> {
        &self.pipeline
    }

    /// Restores the previous session. See [`SessionFacade::bootstrap`].
    pub async fn bootstrap(&self) {
        self.session.bootstrap().await;
    }

    /// Sends `request` through the gates. Any status comes back as `Ok`.
    pub async fn send(&self, request: Request) -> Result<Response, WardenError> {
        Ok(self.pipeline.send(request).await?)
    }

    /// `GET path`, decoding a JSON body.
    ///
    /// # Errors
    /// [`WardenError::Unauthorized`] if the request is still rejected
    /// after the gates have done what they can; [`WardenError::Transport`]
    /// for other failures.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WardenError> {
        self.call(Request::get(path)).await
    }

    /// `POST path` with a JSON body, decoding a JSON reply.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, WardenError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call(Request::post(path).json(body)?).await
    }

    /// Removes the session gates from the pipeline. Requests sent after
    /// this carry no token. Idempotent.
    pub fn shutdown(&self) {
        if self.gates.lock().take().is_some() {
            tracing::info!("warden client shut down");
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: Request) -> Result<T, WardenError> {
        let path = request.route().to_string();
        let response = self.pipeline.send(request).await?;
        if response.is_auth_failure() {
            return Err(WardenError::Unauthorized {
                status: response.status(),
                path,
            });
        }
        Ok(response.error_for_status()?.json()?)
    }
}
