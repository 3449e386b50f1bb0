//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpClient, Method, Request, Response, TransportError};

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// An [`HttpClient`] that talks to a real server.
///
/// Paths on each [`Request`] are appended to `base_url`. The underlying
/// client keeps a cookie jar, which is how the backend's HTTP-only refresh
/// cookie gets from `/auth/login` to `/auth/refresh-token` without this
/// crate ever seeing it.
#[derive(Clone)]
pub struct ReqwestClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client for `base_url` with the default timeout.
    ///
    /// # Errors
    /// Returns [`TransportError::Request`] if the TLS backend can't be
    /// initialised.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client for `base_url` with an explicit per-request timeout.
    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        tracing::info!(base_url, "HTTP transport ready");
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

impl HttpClient for ReqwestClient {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        let method = match request.method() {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.http.request(method, self.url_for(request.path()));
        for (name, value) in request.headers() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let resp = builder.send().await.map_err(map_error)?;

        let mut response = Response::new(resp.status().as_u16());
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                response = response.with_header(name.as_str(), value);
            }
        }
        let body = resp.bytes().await.map_err(map_error)?;

        tracing::debug!(
            method = %request.method(),
            path = request.path(),
            status = response.status(),
            "request completed"
        );
        Ok(response.with_body(body.to_vec()))
    }
}

fn map_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_paths() {
        let client = ReqwestClient::new("http://portal.local/api/").unwrap();
        assert_eq!(client.base_url(), "http://portal.local/api");
        assert_eq!(
            client.url_for("/auth/login"),
            "http://portal.local/api/auth/login"
        );
        assert_eq!(
            client.url_for("students"),
            "http://portal.local/api/students"
        );
    }

    #[tokio::test]
    async fn test_send_unreachable_host_is_transport_error() {
        // Port 9 (discard) on localhost is closed on any sane test host.
        let client = ReqwestClient::with_timeout(
            "http://127.0.0.1:9",
            Duration::from_secs(2),
        )
        .unwrap();
        let result = client.send(Request::get("/health")).await;
        assert!(result.is_err());
    }
}
