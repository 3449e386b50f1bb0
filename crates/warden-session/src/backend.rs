//! The portal backend's authentication endpoints.
//!
//! The session layer calls the backend through the [`AuthBackend`] trait.
//! [`HttpAuthBackend`] is the production implementation; tests use
//! scripted ones.
//!
//! | Call       | Endpoint                   | Credential             |
//! |------------|----------------------------|------------------------|
//! | `login`    | `POST /auth/login`         | email + password       |
//! | `register` | `POST /auth/register`      | none                   |
//! | `refresh`  | `POST /auth/refresh-token` | HTTP-only cookie       |
//! | `logout`   | `POST /auth/logout`        | bearer access token    |

use std::future::Future;

use serde::de::DeserializeOwned;
use warden_protocol::{
    AccessToken, LoginRequest, LoginResponse, MessageResponse,
    RefreshResponse, RegisterRequest, RegisterResponse,
};
use warden_transport::{HttpClient, Request, Response, AUTHORIZATION};

use crate::BackendError;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// The authentication half of the portal API.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one backend is shared by the facade and the
///   refresh coordinator, and refreshes run inside shared futures that
///   outlive any single caller.
/// - Every returned future is `Send` so callers can `tokio::spawn` work
///   that logs in or refreshes.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges email and password for an access token and the profile.
    fn login(
        &self,
        request: &LoginRequest,
    ) -> impl Future<Output = Result<LoginResponse, BackendError>> + Send;

    /// Creates an account. Does not sign it in.
    fn register(
        &self,
        request: &RegisterRequest,
    ) -> impl Future<Output = Result<RegisterResponse, BackendError>> + Send;

    /// Exchanges the out-of-band refresh credential for a new access token.
    fn refresh(
        &self,
    ) -> impl Future<Output = Result<RefreshResponse, BackendError>> + Send;

    /// Invalidates the session server-side.
    fn logout(
        &self,
        access_token: Option<&AccessToken>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}

// ---------------------------------------------------------------------------
// HttpAuthBackend
// ---------------------------------------------------------------------------

/// [`AuthBackend`] over any [`HttpClient`].
///
/// The client should carry cookies between calls (as
/// [`ReqwestClient`](warden_transport::ReqwestClient) does), since the
/// refresh credential is a cookie set by `/auth/login`.
///
/// If the client is an interceptor [`Pipeline`](warden_transport::Pipeline),
/// the auth paths are exempt from the session gates, so sending through it
/// is safe.
#[derive(Debug, Clone)]
pub struct HttpAuthBackend<C> {
    client: C,
}

impl<C: HttpClient> HttpAuthBackend<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: Request,
    ) -> Result<T, BackendError> {
        let path = request.path().to_string();
        let response = self.client.send(request).await?;
        if !response.is_success() {
            let err = rejection(&response);
            tracing::debug!(path, status = response.status(), "auth call rejected");
            return Err(err);
        }
        response
            .json()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

impl<C: HttpClient> AuthBackend for HttpAuthBackend<C> {
    async fn login(
        &self,
        request: &LoginRequest,
    ) -> Result<LoginResponse, BackendError> {
        self.call(Request::post(LOGIN_PATH).json(request)?).await
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, BackendError> {
        self.call(Request::post(REGISTER_PATH).json(request)?).await
    }

    async fn refresh(&self) -> Result<RefreshResponse, BackendError> {
        self.call(Request::post(REFRESH_PATH)).await
    }

    async fn logout(
        &self,
        access_token: Option<&AccessToken>,
    ) -> Result<(), BackendError> {
        let mut request = Request::post(LOGOUT_PATH);
        if let Some(token) = access_token {
            request.set_header(AUTHORIZATION, token.bearer());
        }
        let _: MessageResponse = self.call(request).await?;
        Ok(())
    }
}

/// Builds a [`BackendError::Rejected`], preferring the backend's own
/// `{ "message": ... }` over a generic one.
fn rejection(response: &Response) -> BackendError {
    let message = response
        .json::<MessageResponse>()
        .ok()
        .map(|m| m.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("HTTP {}", response.status()));
    BackendError::Rejected {
        status: response.status(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use warden_protocol::{Role, UserId, UserProfile};
    use warden_transport::TransportError;

    use super::*;

    /// Replies with a canned response and records the request.
    struct Canned {
        reply: Response,
        seen: Mutex<Vec<Request>>,
    }

    impl Canned {
        fn new(reply: Response) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for Canned {
        async fn send(
            &self,
            request: Request,
        ) -> Result<Response, TransportError> {
            self.seen.lock().push(request);
            Ok(self.reply.clone())
        }
    }

    fn user() -> UserProfile {
        UserProfile {
            id: UserId("u-9".into()),
            email: "o@uni.edu".into(),
            first_name: "Ola".into(),
            last_name: "Ade".into(),
            role: Role::Admin,
            phone: None,
            department: None,
        }
    }

    #[tokio::test]
    async fn test_login_posts_credentials_and_decodes_response() {
        let body = LoginResponse {
            access_token: AccessToken::new("a.b.c"),
            user: user(),
        };
        let backend =
            HttpAuthBackend::new(Canned::new(Response::with_json(200, &body).unwrap()));

        let resp = backend
            .login(&LoginRequest {
                email: "o@uni.edu".into(),
                password: "pw".into(),
            })
            .await
            .expect("login should succeed");

        assert_eq!(resp.user, user());
        let seen = backend.client().seen.lock();
        assert_eq!(seen[0].path(), LOGIN_PATH);
        assert!(seen[0].body().is_some());
    }

    #[tokio::test]
    async fn test_rejection_uses_backend_message() {
        let reply = Response::with_json(
            401,
            &serde_json::json!({"message": "Invalid credentials"}),
        )
        .unwrap();
        let backend = HttpAuthBackend::new(Canned::new(reply));

        let err = backend.refresh().await.unwrap_err();

        assert!(err.is_auth_failure());
        assert!(matches!(
            err,
            BackendError::Rejected { status: 401, ref message } if message == "Invalid credentials"
        ));
    }

    #[tokio::test]
    async fn test_rejection_without_body_has_generic_message() {
        let backend = HttpAuthBackend::new(Canned::new(Response::new(502)));
        let err = backend.refresh().await.unwrap_err();
        assert!(matches!(
            err,
            BackendError::Rejected { status: 502, ref message } if message == "HTTP 502"
        ));
        assert!(!err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_logout_sends_bearer_token() {
        let reply =
            Response::with_json(200, &serde_json::json!({"message": "ok"})).unwrap();
        let backend = HttpAuthBackend::new(Canned::new(reply));

        backend
            .logout(Some(&AccessToken::new("tok")))
            .await
            .expect("logout should succeed");

        let seen = backend.client().seen.lock();
        assert_eq!(seen[0].path(), LOGOUT_PATH);
        assert_eq!(seen[0].bearer_token(), Some("tok"));
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_decode_error() {
        let reply = Response::new(200).with_body("not json");
        let backend = HttpAuthBackend::new(Canned::new(reply));
        let err = backend.refresh().await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
