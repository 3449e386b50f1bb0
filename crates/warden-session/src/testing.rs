//! Test doubles for the session layer.
//!
//! - [`ScriptedBackend`]: an [`AuthBackend`] whose answers are set by the
//!   test, with call counters.
//! - [`MockPortal`]: an in-process [`HttpClient`] that behaves like the
//!   portal API, auth endpoints and protected resources included. Use it
//!   to drive the full interceptor pipeline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::watch;
use warden_protocol::testing::token_expiring_in;
use warden_protocol::{
    AccessToken, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest,
    RegisterResponse, Role, UserId, UserProfile,
};
use warden_transport::{HttpClient, Request, Response, TransportError};

use crate::backend::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::{AuthBackend, BackendError};

/// The only password [`ScriptedBackend`] and [`MockPortal`] accept.
pub const PASSWORD: &str = "correct-horse";

/// Lifetime of every token minted by the doubles.
const TOKEN_TTL_SECS: u64 = 3600;

/// A student profile derived from `name`.
pub fn user(name: &str) -> UserProfile {
    UserProfile {
        id: UserId(format!("u-{name}")),
        email: format!("{name}@uni.edu"),
        first_name: name.to_string(),
        last_name: "Tester".to_string(),
        role: Role::Student,
        phone: None,
        department: None,
    }
}

fn name_of(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// A gate that holds async calls until the test releases it.
struct Hold(watch::Sender<bool>);

impl Hold {
    fn new() -> Self {
        Self(watch::channel(false).0)
    }

    fn set(&self, held: bool) {
        self.0.send_replace(held);
    }

    async fn wait(&self) {
        let mut rx = self.0.subscribe();
        // The sender lives in `self`, so this can't see a closed channel.
        let _ = rx.wait_for(|held| !held).await;
    }
}

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// What the next refresh calls answer.
#[derive(Debug, Clone)]
pub enum RefreshScript {
    /// A fresh token, without a user.
    Succeed,
    /// A fresh token and this profile.
    SucceedWithUser(UserProfile),
    /// A rejection with this status.
    Reject(u16),
    /// No response at all.
    Unreachable,
}

/// An [`AuthBackend`] driven by the test.
///
/// Login accepts any email with [`PASSWORD`]. Every refresh mints a token
/// with a new subject, so consecutive refreshes never return equal tokens.
pub struct ScriptedBackend {
    refresh_script: Mutex<RefreshScript>,
    refresh_hold: Hold,
    logout_hold: Hold,
    logout_fails: AtomicBool,
    refresh_calls: AtomicUsize,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    register_calls: AtomicUsize,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            refresh_script: Mutex::new(RefreshScript::Succeed),
            refresh_hold: Hold::new(),
            logout_hold: Hold::new(),
            logout_fails: AtomicBool::new(false),
            refresh_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            register_calls: AtomicUsize::new(0),
        }
    }

    pub fn script_refresh(&self, script: RefreshScript) {
        *self.refresh_script.lock() = script;
    }

    /// Makes refresh calls wait until [`release_refreshes`](Self::release_refreshes).
    pub fn hold_refreshes(&self) {
        self.refresh_hold.set(true);
    }

    pub fn release_refreshes(&self) {
        self.refresh_hold.set(false);
    }

    /// Makes logout calls wait until [`release_logouts`](Self::release_logouts).
    pub fn hold_logouts(&self) {
        self.logout_hold.set(true);
    }

    pub fn release_logouts(&self) {
        self.logout_hold.set(false);
    }

    pub fn fail_logouts(&self) {
        self.logout_fails.store(true, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }
}

impl AuthBackend for ScriptedBackend {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, BackendError> {
        let n = self.login_calls.fetch_add(1, Ordering::SeqCst);
        if request.password != PASSWORD {
            return Err(BackendError::Rejected {
                status: 401,
                message: "Invalid credentials".into(),
            });
        }
        let name = name_of(&request.email);
        Ok(LoginResponse {
            access_token: token_expiring_in(&format!("{name}#login{n}"), TOKEN_TTL_SECS),
            user: user(name),
        })
    }

    async fn register(
        &self,
        request: &RegisterRequest,
    ) -> Result<RegisterResponse, BackendError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        let mut profile = user(name_of(&request.email));
        profile.first_name = request.first_name.clone();
        profile.last_name = request.last_name.clone();
        profile.role = request.role;
        Ok(RegisterResponse {
            user: profile,
            message: Some("Registered".into()),
        })
    }

    async fn refresh(&self) -> Result<RefreshResponse, BackendError> {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_hold.wait().await;

        let script = self.refresh_script.lock().clone();
        let access_token = token_expiring_in(&format!("refresh#{n}"), TOKEN_TTL_SECS);
        match script {
            RefreshScript::Succeed => Ok(RefreshResponse {
                access_token,
                user: None,
            }),
            RefreshScript::SucceedWithUser(user) => Ok(RefreshResponse {
                access_token,
                user: Some(user),
            }),
            RefreshScript::Reject(status) => Err(BackendError::Rejected {
                status,
                message: "Invalid refresh token".into(),
            }),
            RefreshScript::Unreachable => Err(BackendError::Transport(
                TransportError::Connect("connection refused".into()),
            )),
        }
    }

    async fn logout(&self, _access_token: Option<&AccessToken>) -> Result<(), BackendError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_hold.wait().await;
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(BackendError::Transport(TransportError::Timeout));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockPortal
// ---------------------------------------------------------------------------

/// An in-process stand-in for the portal API.
///
/// - `/auth/*` behave like the real endpoints. Logging in sets the
///   refresh "cookie"; logging out clears it; refreshing without it is a
///   401.
/// - Every other path is a protected resource: 200 with a small JSON body
///   if the bearer token is one the portal issued and is unexpired, 401
///   otherwise.
pub struct MockPortal {
    issued: Mutex<HashSet<String>>,
    refresh_cookie: AtomicBool,
    reject_everything: AtomicBool,
    refresh_hold: Hold,
    refresh_calls: AtomicUsize,
    minted: AtomicUsize,
    seen: Mutex<Vec<Request>>,
}

impl Default for MockPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPortal {
    pub fn new() -> Self {
        Self {
            issued: Mutex::new(HashSet::new()),
            refresh_cookie: AtomicBool::new(false),
            reject_everything: AtomicBool::new(false),
            refresh_hold: Hold::new(),
            refresh_calls: AtomicUsize::new(0),
            minted: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Pretends a previous process logged in: the refresh cookie is set.
    pub fn grant_refresh_cookie(&self) {
        self.refresh_cookie.store(true, Ordering::SeqCst);
    }

    /// Makes every protected resource answer 401, whatever the token.
    pub fn reject_everything(&self) {
        self.reject_everything.store(true, Ordering::SeqCst);
    }

    /// Registers `token` as one the portal issued.
    pub fn accept(&self, token: &AccessToken) {
        self.issued.lock().insert(token.as_str().to_string());
    }

    /// Forgets every token issued so far, as a server-side revocation
    /// would. The refresh cookie survives.
    pub fn revoke_tokens(&self) {
        self.issued.lock().clear();
    }

    pub fn hold_refreshes(&self) {
        self.refresh_hold.set(true);
    }

    pub fn release_refreshes(&self) {
        self.refresh_hold.set(false);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Every request that reached the portal, in arrival order.
    pub fn seen(&self) -> Vec<Request> {
        self.seen.lock().clone()
    }

    /// Requests to protected resources that reached the portal.
    pub fn protected_requests(&self) -> Vec<Request> {
        self.seen()
            .into_iter()
            .filter(|r| !r.route().starts_with("/auth/"))
            .collect()
    }

    fn mint(&self, subject: &str) -> AccessToken {
        let n = self.minted.fetch_add(1, Ordering::SeqCst);
        let token = token_expiring_in(&format!("{subject}#{n}"), TOKEN_TTL_SECS);
        self.accept(&token);
        token
    }

    fn login(&self, request: &Request) -> Response {
        let Some(login) = request
            .body()
            .and_then(|b| serde_json::from_slice::<LoginRequest>(b).ok())
        else {
            return reply(400, json!({"message": "Bad request"}));
        };
        if login.password != PASSWORD {
            return reply(401, json!({"message": "Invalid credentials"}));
        }
        self.refresh_cookie.store(true, Ordering::SeqCst);
        let name = name_of(&login.email);
        let body = LoginResponse {
            access_token: self.mint(name),
            user: user(name),
        };
        reply(200, json!(body))
    }

    async fn refresh(&self) -> Response {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refresh_hold.wait().await;
        if !self.refresh_cookie.load(Ordering::SeqCst) {
            return reply(401, json!({"message": "Invalid refresh token"}));
        }
        let body = RefreshResponse {
            access_token: self.mint("refreshed"),
            user: None,
        };
        reply(200, json!(body))
    }

    fn protected(&self, request: &Request) -> Response {
        if self.reject_everything.load(Ordering::SeqCst) {
            return reply(401, json!({"message": "Unauthorized"}));
        }
        let authorized = request.bearer_token().is_some_and(|token| {
            self.issued.lock().contains(token)
                && !warden_protocol::codec::is_expired(token, SystemTime::now(), Duration::ZERO)
        });
        if !authorized {
            return reply(401, json!({"message": "Unauthorized"}));
        }
        reply(200, json!({"path": request.route(), "ok": true}))
    }
}

impl HttpClient for MockPortal {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.seen.lock().push(request.clone());
        let response = match request.route() {
            LOGIN_PATH => self.login(&request),
            REFRESH_PATH => self.refresh().await,
            LOGOUT_PATH => {
                self.refresh_cookie.store(false, Ordering::SeqCst);
                reply(200, json!({"message": "Logged out"}))
            }
            REGISTER_PATH => match request
                .body()
                .and_then(|b| serde_json::from_slice::<RegisterRequest>(b).ok())
            {
                Some(register) => {
                    let mut profile = user(name_of(&register.email));
                    profile.role = register.role;
                    reply(201, json!({"user": profile}))
                }
                None => reply(400, json!({"message": "Bad request"})),
            },
            _ => self.protected(&request),
        };
        Ok(response)
    }
}

fn reply(status: u16, body: serde_json::Value) -> Response {
    Response::new(status)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}
