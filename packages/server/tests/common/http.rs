//! In-process HTTP client for router tests.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use estate_core::kernel::test_dependencies::TestDependencies;
use estate_core::server::api_router;
use estate_core::server::cookies::CookiePolicy;
use estate_core::server::AppState;
use serde_json::Value;
use tower::ServiceExt;

/// Router wired to in-memory dependencies.
pub struct TestApp {
    pub router: Router,
    pub deps: TestDependencies,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub set_cookies: Vec<Cookie<'static>>,
    pub body: Value,
}

impl TestResponse {
    /// The value of a cookie set by this response.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.set_cookies
            .iter()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_deps(TestDependencies::new())
    }

    pub fn with_deps(deps: TestDependencies) -> Self {
        let state = AppState::new(deps.clone().into_server_deps(), None, CookiePolicy::new(false));
        Self {
            router: api_router(state),
            deps,
        }
    }

    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(body), &[]).await
    }

    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(header::HeaderName, String)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let set_cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|value| Cookie::parse_encoded(value.to_str().unwrap().to_string()).unwrap())
            .collect();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            set_cookies,
            body,
        }
    }

    /// Send a code to `phone` and return the session id.
    pub async fn start_login(&self, phone: &str) -> String {
        let response = self
            .post("/api/auth/send-otp", serde_json::json!({ "phone": phone }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["sessionId"].as_str().unwrap().to_string()
    }
}
