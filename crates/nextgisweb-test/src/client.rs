//! In-process HTTP client.
//!
//! [`TestClient`] sends requests straight into an axum [`Router`] and keeps
//! the cookies the application sets, so an `auth_tkt` obtained once is sent
//! with every following request.
//!
//! ```rust,no_run
//! use axum::routing::get;
//! use axum::Router;
//! use nextgisweb_test::TestClient;
//!
//! async fn example() {
//!     let app = Router::new().route("/ping", get(|| async { "pong" }));
//!     let mut client = TestClient::new(app);
//!     let response = client.get("/ping").await;
//!     assert_eq!(response.status_code(), 200);
//! }
//! ```

use std::collections::HashMap;

use axum::body::Body;
use axum::Router;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use nextgisweb_core::{NgwError, NgwResult};

/// Drives a router with simulated requests.
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        Self {
            app,
            cookies: HashMap::new(),
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.request(Method::GET, path, Bytes::new(), None).await
    }

    /// Sends `body` as JSON with `PUT`.
    pub async fn put_json(&mut self, path: &str, body: &JsonValue) -> TestResponse {
        self.request(
            Method::PUT,
            path,
            Bytes::from(body.to_string()),
            Some("application/json"),
        )
        .await
    }

    /// Sends raw bytes with `PUT`.
    pub async fn put_bytes(
        &mut self,
        path: &str,
        body: impl Into<Bytes>,
        content_type: &str,
    ) -> TestResponse {
        self.request(Method::PUT, path, body.into(), Some(content_type))
            .await
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Bytes,
        content_type: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        if let Some(cookie) = self.cookie_header() {
            builder = builder.header(COOKIE, cookie);
        }
        let req = builder
            .body(Body::from(body))
            .expect("request builder should not fail");

        self.send(req).await
    }

    async fn send(&mut self, req: Request<Body>) -> TestResponse {
        let response = self
            .app
            .clone()
            .oneshot(req)
            .await
            .expect("router should not error");

        let status = response.status();
        let headers = response.headers().clone();

        for value in headers.get_all(SET_COOKIE) {
            let Some(pair) = value.to_str().ok().and_then(|c| c.split(';').next()) else {
                continue;
            };
            if let Some((name, val)) = pair.split_once('=') {
                let (name, val) = (name.trim(), val.trim());
                if val.is_empty() {
                    self.cookies.remove(name);
                } else {
                    self.cookies.insert(name.to_string(), val.to_string());
                }
            }
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_or_else(|_| Bytes::new(), http_body_util::Collected::to_bytes);

        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("cookies", &self.cookies)
            .finish_non_exhaustive()
    }
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json(&self) -> NgwResult<JsonValue> {
        serde_json::from_slice(&self.body).map_err(|e| NgwError::SerializationError(e.to_string()))
    }

    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
