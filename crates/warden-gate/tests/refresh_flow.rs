//! End-to-end tests: gates on a pipeline in front of an in-process portal.

use std::sync::Arc;

use parking_lot::Mutex;
use warden_gate::install;
use warden_protocol::testing::token_expired_for;
use warden_session::testing::{user, MockPortal, PASSWORD};
use warden_session::{
    HttpAuthBackend, SessionConfig, SessionFacade, SESSION_EXPIRED_MESSAGE,
};
use warden_store::MemoryStore;
use warden_transport::{HttpClient, Pipeline, Request};

type Facade = SessionFacade<HttpAuthBackend<Arc<MockPortal>>, MemoryStore>;

struct Harness {
    portal: Arc<MockPortal>,
    facade: Facade,
    pipeline: Arc<Pipeline<Arc<MockPortal>>>,
}

fn harness() -> Harness {
    let portal = Arc::new(MockPortal::new());
    let facade = SessionFacade::new(
        HttpAuthBackend::new(Arc::clone(&portal)),
        MemoryStore::new(),
        SessionConfig::default(),
    );
    let pipeline = Arc::new(Pipeline::new(Arc::clone(&portal)));
    Harness {
        portal,
        facade,
        pipeline,
    }
}

#[tokio::test]
async fn test_expired_token_concurrent_requests_share_one_refresh() {
    let h = harness();
    let _gates = install(&h.pipeline, h.facade.coordinator());
    h.facade
        .credentials()
        .set(&token_expired_for("ada", 30), &user("ada"))
        .unwrap();
    h.portal.grant_refresh_cookie();
    h.portal.hold_refreshes();

    let requests: Vec<_> = ["/students", "/courses", "/officers"]
        .into_iter()
        .map(|path| {
            let pipeline = Arc::clone(&h.pipeline);
            tokio::spawn(async move { pipeline.send(Request::get(path)).await })
        })
        .collect();
    tokio::task::yield_now().await;
    h.portal.release_refreshes();

    for request in requests {
        let response = request.await.unwrap().unwrap();
        assert_eq!(response.status(), 200);
    }

    assert_eq!(h.portal.refresh_calls(), 1);
    let fresh = h.facade.access_token().expect("session refreshed");
    let protected = h.portal.protected_requests();
    assert_eq!(protected.len(), 3);
    assert!(protected
        .iter()
        .all(|r| r.bearer_token() == Some(fresh.as_str())));
}

#[tokio::test]
async fn test_resource_rejecting_fresh_token_is_retried_exactly_once() {
    let h = harness();
    let _gates = install(&h.pipeline, h.facade.coordinator());
    h.facade.login("ada@uni.edu", PASSWORD).await.unwrap();
    h.portal.reject_everything();

    let response = h.pipeline.send(Request::get("/students")).await.unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(h.portal.refresh_calls(), 1);
    let protected = h.portal.protected_requests();
    assert_eq!(protected.len(), 2);
    assert!(!protected[0].is_retried());
    assert!(protected[1].is_retried());
}

#[tokio::test]
async fn test_revoked_token_is_refreshed_and_request_succeeds() {
    let h = harness();
    let _gates = install(&h.pipeline, h.facade.coordinator());
    h.facade.login("ada@uni.edu", PASSWORD).await.unwrap();
    let revoked = h.facade.access_token().unwrap();
    h.portal.revoke_tokens();

    let response = h.pipeline.send(Request::get("/students")).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(h.portal.refresh_calls(), 1);
    let protected = h.portal.protected_requests();
    assert_eq!(protected[0].bearer_token(), Some(revoked.as_str()));
    assert_ne!(protected[1].bearer_token(), Some(revoked.as_str()));
}

#[tokio::test]
async fn test_failed_refresh_ends_session_and_surfaces_401() {
    let h = harness();
    let _gates = install(&h.pipeline, h.facade.coordinator());
    let redirects = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&redirects);
    h.facade
        .register_navigator(Arc::new(move |m: &str, e: bool| {
            sink.lock().push((m.to_string(), e));
        }));
    // No refresh cookie: the portal will refuse to refresh.
    h.facade
        .credentials()
        .set(&token_expired_for("ada", 30), &user("ada"))
        .unwrap();

    let response = h.pipeline.send(Request::get("/students")).await.unwrap();

    assert_eq!(response.status(), 401);
    assert_eq!(h.portal.refresh_calls(), 1);
    assert!(!h.facade.is_authenticated());
    assert_eq!(h.facade.credentials().get(), None);
    assert_eq!(
        *redirects.lock(),
        vec![(SESSION_EXPIRED_MESSAGE.to_string(), true)]
    );
    let protected = h.portal.protected_requests();
    assert_eq!(protected.len(), 1);
    assert_eq!(protected[0].bearer_token(), None);
}

#[tokio::test]
async fn test_dropping_registrations_removes_gates() {
    let h = harness();
    let gates = install(&h.pipeline, h.facade.coordinator());
    h.facade.login("ada@uni.edu", PASSWORD).await.unwrap();
    assert_eq!(h.pipeline.interceptor_count(), 2);

    drop(gates);
    let response = h.pipeline.send(Request::get("/students")).await.unwrap();

    assert_eq!(h.pipeline.interceptor_count(), 0);
    assert_eq!(response.status(), 401);
    assert_eq!(h.portal.protected_requests()[0].bearer_token(), None);
}

#[tokio::test]
async fn test_auth_endpoints_bypass_token_injection() {
    let h = harness();
    let _gates = install(&h.pipeline, h.facade.coordinator());
    h.facade.login("ada@uni.edu", PASSWORD).await.unwrap();

    let body = serde_json::json!({"email": "ada@uni.edu", "password": PASSWORD});
    let request = Request::post("/auth/login").json(&body).unwrap();
    let response = h.pipeline.send(request).await.unwrap();

    assert_eq!(response.status(), 200);
    let login = h
        .portal
        .seen()
        .into_iter()
        .filter(|r| r.route() == "/auth/login")
        .last()
        .unwrap();
    assert_eq!(login.bearer_token(), None);
}
