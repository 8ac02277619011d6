//! Thin HTTP client over the in-process router.
//!
//! Drives the real axum app via `tower::ServiceExt::oneshot`, so every test
//! exercises routing, middleware, extractors, and error mapping exactly as a
//! network client would.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub struct ApiClient {
    app: Router,
}

impl ApiClient {
    pub fn new(app: Router) -> Self {
        Self { app }
    }

    /// GET `path`, optionally authenticated.
    pub async fn get(&self, path: &str, token: Option<&str>) -> ApiResponse {
        self.send(Method::GET, path, token, None, None).await
    }

    /// POST a JSON body.
    pub async fn post_json(&self, path: &str, token: Option<&str>, body: &Value) -> ApiResponse {
        self.send(
            Method::POST,
            path,
            token,
            Some("application/json"),
            Some(body.to_string()),
        )
        .await
    }

    /// POST a form-encoded body (the /token and job control endpoints).
    pub async fn post_form(&self, path: &str, token: Option<&str>, form: &str) -> ApiResponse {
        self.send(
            Method::POST,
            path,
            token,
            Some("application/x-www-form-urlencoded"),
            Some(form.to_string()),
        )
        .await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: Option<String>,
    ) -> ApiResponse {
        let mut builder = Request::builder().method(method).uri(path);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(ct) = content_type {
            builder = builder.header(header::CONTENT_TYPE, ct);
        }

        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .expect("failed to build request");

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router returned infallible error");

        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read response body")
            .to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body was not JSON")
        };

        ApiResponse {
            status,
            body,
            location,
        }
    }
}

pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
    pub location: Option<String>,
}

impl ApiResponse {
    /// Machine-readable error code from the `{"error": {"code": ...}}` body.
    pub fn error_code(&self) -> &str {
        self.body["error"]["code"]
            .as_str()
            .expect("response body carried no error code")
    }
}
