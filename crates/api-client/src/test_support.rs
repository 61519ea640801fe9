//! In-process mock API for pipeline tests.
//!
//! Routes (all under `/v1`):
//! - `POST /auth/login`: `ada@example.com` / `hunter2` → `at_login` plus cookies
//! - `POST /auth/refresh`: per [`RefreshMode`], returns `at_fresh` after 50 ms
//! - `POST /auth/logout`, `POST /auth/logout-all`
//! - `GET /auth/me`: requires a known bearer
//! - `GET /protected`: 200 only for `Bearer at_fresh`
//! - `GET /always-401`: always 401
//! - `GET|POST /echo`: returns the auth headers it received
//! - `POST /validation`: 400 with field details
//! - `DELETE /items/1`: 204
//! - `GET /slow`: answers after two seconds

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use reqwest::Url;
use reqwest::cookie::Jar;
use serde_json::{Value, json};
use session_auth::{AntiForgeryReader, CredentialStore};
use tokio::net::TcpListener;

use crate::client::{ApiClient, ClientConfig};
use crate::navigator::Navigator;

/// How the mock refresh endpoint behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Succeed,
    /// 401 with a "revoked" message
    Fail,
    /// 500
    ServerError,
    /// Holds the exchange for five seconds before answering
    Stall,
}

#[derive(Debug)]
pub struct MockState {
    pub mode: RefreshMode,
    pub refresh_hits: AtomicUsize,
    pub protected_hits: AtomicUsize,
    pub always_401_hits: AtomicUsize,
    pub login_hits: AtomicUsize,
    pub logout_hits: AtomicUsize,
    pub fail_logout: AtomicBool,
    /// `Authorization` values seen by `/protected`, in arrival order
    pub protected_auth: Mutex<Vec<String>>,
    /// Anti-forgery header sent with each refresh
    pub refresh_csrf: Mutex<Vec<Option<String>>>,
}

pub struct MockServer {
    pub state: Arc<MockState>,
    pub jar: Arc<Jar>,
    base: String,
}

impl MockServer {
    pub async fn start(mode: RefreshMode) -> Self {
        let state = Arc::new(MockState {
            mode,
            refresh_hits: AtomicUsize::new(0),
            protected_hits: AtomicUsize::new(0),
            always_401_hits: AtomicUsize::new(0),
            login_hits: AtomicUsize::new(0),
            logout_hits: AtomicUsize::new(0),
            fail_logout: AtomicBool::new(false),
            protected_auth: Mutex::new(Vec::new()),
            refresh_csrf: Mutex::new(Vec::new()),
        });

        let app = axum::Router::new()
            .route("/v1/auth/login", post(login))
            .route("/v1/auth/refresh", post(refresh))
            .route("/v1/auth/logout", post(logout))
            .route("/v1/auth/logout-all", post(logout))
            .route("/v1/auth/me", get(me))
            .route("/v1/protected", get(protected))
            .route("/v1/always-401", get(always_401))
            .route("/v1/echo", get(echo).post(echo))
            .route("/v1/validation", post(validation))
            .route("/v1/items/1", delete(|| async { StatusCode::NO_CONTENT }))
            .route(
                "/v1/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({"ok": true}))
                }),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            jar: Arc::new(Jar::default()),
            base: format!("http://{addr}"),
        }
    }

    /// Absolute URL for a server path such as `/v1/auth/refresh`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn origin(&self) -> Url {
        Url::parse(&self.url("/v1")).unwrap()
    }

    pub fn set_csrf_cookie(&self, value: &str) {
        self.jar
            .add_cookie_str(&format!("csrf_token={value}; Path=/"), &self.origin());
        self.jar
            .add_cookie_str("refresh_token=rt_valid; Path=/v1/auth; HttpOnly", &self.origin());
    }

    pub fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_provider(self.jar.clone())
            .build()
            .unwrap()
    }

    pub fn anti_forgery(&self) -> AntiForgeryReader {
        AntiForgeryReader::new(self.jar.clone(), self.origin(), "csrf_token")
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base.clone(),
            ..ClientConfig::default()
        }
    }

    /// Client sharing this server's cookie jar.
    pub fn client(&self, store: Arc<CredentialStore>, navigator: Arc<dyn Navigator>) -> ApiClient {
        self.client_with(self.config(), store, navigator)
    }

    pub fn client_with(
        &self,
        config: ClientConfig,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
    ) -> ApiClient {
        ApiClient::with_cookie_store(config, store, navigator, self.jar.clone()).unwrap()
    }

    pub fn refresh_hits(&self) -> usize {
        self.state.refresh_hits.load(Ordering::SeqCst)
    }
}

/// Navigator that records every route it is sent to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.routes.lock().unwrap().len()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Unauthorized", "message": message})),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_hits.fetch_add(1, Ordering::SeqCst);
    if body["email"] == "ada@example.com" && body["password"] == "hunter2" {
        let mut headers = HeaderMap::new();
        headers.append(
            header::SET_COOKIE,
            "refresh_token=rt_login; Path=/v1/auth; HttpOnly".parse().unwrap(),
        );
        headers.append(
            header::SET_COOKIE,
            "csrf_token=tok_login; Path=/".parse().unwrap(),
        );
        (headers, Json(json!({"access_token": "at_login"}))).into_response()
    } else {
        unauthorized("Invalid email or password")
    }
}

async fn refresh(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.refresh_hits.fetch_add(1, Ordering::SeqCst);
    state
        .refresh_csrf
        .lock()
        .unwrap()
        .push(header_str(&headers, "x-csrf-token"));
    // Hold the exchange open so concurrent 401s pile up behind it
    tokio::time::sleep(Duration::from_millis(50)).await;
    if state.mode == RefreshMode::Stall {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }

    match state.mode {
        RefreshMode::Succeed | RefreshMode::Stall => {
            Json(json!({"access_token": "at_fresh"})).into_response()
        }
        RefreshMode::Fail => unauthorized("Refresh token revoked"),
        RefreshMode::ServerError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<MockState>>) -> Response {
    state.logout_hits.fetch_add(1, Ordering::SeqCst);
    if state.fail_logout.load(Ordering::SeqCst) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        )
            .into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    match header_str(&headers, "authorization").as_deref() {
        Some("Bearer at_login" | "Bearer at_fresh") => Json(json!({
            "id": "8b0e6a5c-1f43-4c1e-9d7e-2f7b9f0a1c11",
            "email": "ada@example.com",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "role": "Manager",
            "phone": null,
            "organization_id": "org_1"
        }))
        .into_response(),
        _ => unauthorized("Invalid or expired token"),
    }
}

async fn protected(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.protected_hits.fetch_add(1, Ordering::SeqCst);
    let auth = header_str(&headers, "authorization");
    state
        .protected_auth
        .lock()
        .unwrap()
        .push(auth.clone().unwrap_or_default());
    match auth.as_deref() {
        Some("Bearer at_fresh") => Json(json!({"ok": true})).into_response(),
        _ => unauthorized("Invalid or expired token"),
    }
}

async fn always_401(State(state): State<Arc<MockState>>) -> Response {
    state.always_401_hits.fetch_add(1, Ordering::SeqCst);
    unauthorized("Invalid or expired token")
}

async fn echo(headers: HeaderMap) -> Json<Value> {
    Json(json!({
        "authorization": header_str(&headers, "authorization"),
        "csrf": header_str(&headers, "x-csrf-token"),
        "custom": header_str(&headers, "x-custom"),
    }))
}

async fn validation() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "Validation failed",
            "details": ["email: must be a valid email address"]
        })),
    )
        .into_response()
}
