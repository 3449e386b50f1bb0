//! Request and response values that flow through the transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::TransportError;

/// Name of the header the session layer attaches bearer tokens to.
pub const AUTHORIZATION: &str = "authorization";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An outbound request, addressed by path relative to the client's base URL.
///
/// Header names are stored lowercased so lookups are case-insensitive.
///
/// A request also carries a `retried` marker. Interceptors that resubmit a
/// request set it so the resubmitted copy is never resubmitted again; the
/// marker lives on the request, not in any shared state, so concurrent
/// requests can't affect each other's retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    headers: BTreeMap<String, String>,
    body: Option<Vec<u8>>,
    retried: bool,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Serializes `body` as JSON and sets the `content-type` header.
    ///
    /// # Errors
    /// Returns [`TransportError::Body`] if `body` can't be serialized.
    pub fn json<T: Serialize + ?Sized>(
        mut self,
        body: &T,
    ) -> Result<Self, TransportError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| TransportError::Body(e.to_string()))?;
        self.set_header("content-type", "application/json");
        self.body = Some(bytes);
        Ok(self)
    }

    /// Builder-style [`set_header`](Self::set_header).
    pub fn with_header(
        mut self,
        name: &str,
        value: impl Into<String>,
    ) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The path without its query string.
    pub fn route(&self) -> &str {
        self.path.split('?').next().unwrap_or_default()
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(&name.to_ascii_lowercase())
    }

    /// The token in an `Authorization: Bearer <token>` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)?.strip_prefix("Bearer ")
    }

    /// Whether this request is already a resubmission.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    /// Marks this request as a resubmission. See the type docs.
    pub fn mark_retried(&mut self) {
        self.retried = true;
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An inbound response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    /// A response with a JSON body.
    ///
    /// # Errors
    /// Returns [`TransportError::Body`] if `body` can't be serialized.
    pub fn with_json<T: Serialize + ?Sized>(
        status: u16,
        body: &T,
    ) -> Result<Self, TransportError> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| TransportError::Body(e.to_string()))?;
        let mut response = Self::new(status).with_body(bytes);
        response
            .headers
            .insert("content-type".into(), "application/json".into());
        Ok(response)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 401 or 403: the credential was missing, expired, or rejected.
    pub fn is_auth_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    /// Returns [`TransportError::Body`] if the body doesn't match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TransportError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| TransportError::Body(e.to_string()))
    }

    /// Passes success responses through and turns anything else into
    /// [`TransportError::Status`].
    pub fn error_for_status(self) -> Result<Self, TransportError> {
        if self.is_success() {
            return Ok(self);
        }
        Err(TransportError::Status {
            status: self.status,
            body: String::from_utf8_lossy(&self.body).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_headers_are_case_insensitive() {
        let req = Request::get("/students").with_header("X-Trace", "abc");
        assert_eq!(req.header("x-trace"), Some("abc"));
        assert_eq!(req.header("X-TRACE"), Some("abc"));
    }

    #[test]
    fn test_request_bearer_token_parses_header() {
        let req =
            Request::get("/students").with_header("Authorization", "Bearer t1");
        assert_eq!(req.bearer_token(), Some("t1"));

        let basic = Request::get("/x").with_header("Authorization", "Basic z");
        assert_eq!(basic.bearer_token(), None);
    }

    #[test]
    fn test_request_route_strips_query() {
        let req = Request::get("/auth/login?next=/dashboard");
        assert_eq!(req.route(), "/auth/login");
    }

    #[test]
    fn test_request_json_sets_content_type() {
        let req = Request::post("/courses")
            .json(&serde_json::json!({"code": "CS101"}))
            .unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body(), Some(br#"{"code":"CS101"}"#.as_slice()));
    }

    #[test]
    fn test_request_retry_marker_starts_clear() {
        let mut req = Request::get("/a");
        assert!(!req.is_retried());
        req.mark_retried();
        assert!(req.is_retried());
    }

    #[test]
    fn test_response_auth_failure_statuses() {
        assert!(Response::new(401).is_auth_failure());
        assert!(Response::new(403).is_auth_failure());
        assert!(!Response::new(404).is_auth_failure());
        assert!(!Response::new(500).is_auth_failure());
    }

    #[test]
    fn test_response_error_for_status_keeps_body() {
        let resp = Response::new(404).with_body("no such course");
        let err = resp.error_for_status().unwrap_err();
        assert!(matches!(
            err,
            TransportError::Status { status: 404, ref body } if body == "no such course"
        ));
    }

    #[test]
    fn test_response_json_decodes_body() {
        let resp =
            Response::with_json(200, &serde_json::json!({"n": 3})).unwrap();
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["n"], 3);
    }
}
