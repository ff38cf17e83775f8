//! In-process mock of the profile API for session tests
//!
//! Binds an axum server to `127.0.0.1:0` and records what it sees: call
//! counts per endpoint, the `Authorization` and `Cookie` headers sent, and
//! sign-up bodies. Refresh behaviour is switchable at runtime.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use tokio::net::TcpListener;

use token_auth::{MemoryTokenStore, TokenStore};

use crate::{SessionConfig, SessionManager};

const REFRESH_COOKIE: &str = "refresh_token=rt1; Path=/; HttpOnly";

/// What `POST /auth/refresh` answers.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// 200 with `Authorization: Bearer <token>`
    Header(String),
    /// 200 with the given raw `Authorization` value
    RawHeader(String),
    /// 200 with `{"access_token": <token>}` and no header
    Body(String),
    /// The given status with an error body
    Status(u16),
    /// 200 with neither header nor token
    Empty,
    /// Never answers
    Hang,
}

#[derive(Debug)]
pub struct MockState {
    pub refresh: Mutex<RefreshBehavior>,
    pub refresh_delay_ms: AtomicU64,
    pub refresh_calls: AtomicUsize,
    pub refresh_cookies: Mutex<Vec<Option<String>>>,
    pub refresh_auth: Mutex<Vec<Option<String>>>,

    /// Token accepted by protected endpoints
    pub valid_token: Mutex<Option<String>>,
    pub always_reject: AtomicBool,
    pub always_accept: AtomicBool,
    pub protected_calls: AtomicUsize,
    pub protected_auth: Mutex<Vec<Option<String>>>,

    pub sign_out_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub sign_out_auth: Mutex<Option<String>>,
    pub hang_sign_out: AtomicBool,
    pub last_sign_up: Mutex<Option<serde_json::Value>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            refresh: Mutex::new(RefreshBehavior::Header("t2".into())),
            refresh_delay_ms: AtomicU64::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_cookies: Mutex::new(vec![]),
            refresh_auth: Mutex::new(vec![]),
            valid_token: Mutex::new(None),
            always_reject: AtomicBool::new(false),
            always_accept: AtomicBool::new(false),
            protected_calls: AtomicUsize::new(0),
            protected_auth: Mutex::new(vec![]),
            sign_out_calls: AtomicUsize::new(0),
            revoke_calls: AtomicUsize::new(0),
            sign_out_auth: Mutex::new(None),
            hang_sign_out: AtomicBool::new(false),
            last_sign_up: Mutex::new(None),
        }
    }
}

pub struct MockApi {
    pub url: String,
    pub state: Arc<MockState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = axum::Router::new()
            .route("/auth/sign_in", post(sign_in))
            .route("/auth/sign_up", post(sign_up))
            .route("/auth/refresh", post(refresh).delete(revoke))
            .route("/auth/sign_out", delete(sign_out))
            .fallback(protected)
            .with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            state,
            _handle: handle,
        }
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        *self.state.refresh.lock().unwrap() = behavior;
    }

    pub fn set_valid_token(&self, token: &str) {
        *self.state.valid_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn protected_auth(&self) -> Vec<Option<String>> {
        self.state.protected_auth.lock().unwrap().clone()
    }
}

pub fn manager_for(api: &MockApi) -> SessionManager {
    manager_with_store(api, Arc::new(MemoryTokenStore::new()))
}

pub fn manager_with_store(api: &MockApi, store: Arc<dyn TokenStore>) -> SessionManager {
    let config = SessionConfig {
        base_url: api.url.clone(),
        ..SessionConfig::default()
    };
    SessionManager::new(config, store).unwrap()
}

/// A base URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn with_refresh_cookie(status: StatusCode, auth: Option<&str>, body: serde_json::Value) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, REFRESH_COOKIE.parse().unwrap());
    if let Some(auth) = auth {
        headers.insert(header::AUTHORIZATION, auth.parse().unwrap());
    }
    (status, headers, Json(body)).into_response()
}

async fn sign_in(State(state): State<Arc<MockState>>, Json(body): Json<serde_json::Value>) -> Response {
    let email = body["auth"]["email"].as_str().unwrap_or_default();
    let password = body["auth"]["password"].as_str().unwrap_or_default();
    if email != "user@example.com" || password != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Invalid email or password" })),
        )
            .into_response();
    }

    *state.valid_token.lock().unwrap() = Some("t1".into());
    with_refresh_cookie(
        StatusCode::OK,
        Some("Bearer t1"),
        serde_json::json!({ "id": 1, "email": email }),
    )
}

async fn sign_up(State(state): State<Arc<MockState>>, Json(body): Json<serde_json::Value>) -> Response {
    *state.last_sign_up.lock().unwrap() = Some(body.clone());
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "error": "Email has already been taken" })),
        )
            .into_response();
    }

    *state.valid_token.lock().unwrap() = Some("t-signup".into());
    with_refresh_cookie(
        StatusCode::CREATED,
        None,
        serde_json::json!({
            "access_token": "t-signup",
            "refresh_token": "rt-ignored",
            "user": { "id": 2, "email": body["email"], "name": body["name"] }
        }),
    )
}

async fn refresh(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    state
        .refresh_cookies
        .lock()
        .unwrap()
        .push(header_string(&headers, header::COOKIE));
    state
        .refresh_auth
        .lock()
        .unwrap()
        .push(header_string(&headers, header::AUTHORIZATION));

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let behavior = state.refresh.lock().unwrap().clone();
    match behavior {
        RefreshBehavior::Header(token) => {
            (StatusCode::OK, [(header::AUTHORIZATION, format!("Bearer {token}"))], "{}")
                .into_response()
        }
        RefreshBehavior::RawHeader(value) => {
            (StatusCode::OK, [(header::AUTHORIZATION, value)], "{}").into_response()
        }
        RefreshBehavior::Body(token) => {
            (StatusCode::OK, Json(serde_json::json!({ "access_token": token }))).into_response()
        }
        RefreshBehavior::Status(code) => (
            StatusCode::from_u16(code).unwrap(),
            Json(serde_json::json!({ "error": "refresh rejected" })),
        )
            .into_response(),
        RefreshBehavior::Empty => (StatusCode::OK, Json(serde_json::json!({}))).into_response(),
        RefreshBehavior::Hang => {
            tokio::time::sleep(Duration::from_secs(30)).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

async fn revoke(State(state): State<Arc<MockState>>) -> Response {
    if state.hang_sign_out.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    state.revoke_calls.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, "refresh_token=; Path=/; Max-Age=0")],
    )
        .into_response()
}

async fn sign_out(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if state.hang_sign_out.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    state.sign_out_calls.fetch_add(1, Ordering::SeqCst);
    *state.sign_out_auth.lock().unwrap() = header_string(&headers, header::AUTHORIZATION);
    StatusCode::NO_CONTENT.into_response()
}

/// Every other path is a protected resource.
async fn protected(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.protected_calls.fetch_add(1, Ordering::SeqCst);
    let auth = header_string(&headers, header::AUTHORIZATION);
    state.protected_auth.lock().unwrap().push(auth.clone());

    let expected = state
        .valid_token
        .lock()
        .unwrap()
        .as_ref()
        .map(|t| format!("Bearer {t}"));
    let authorized = state.always_accept.load(Ordering::SeqCst)
        || (!state.always_reject.load(Ordering::SeqCst) && expected.is_some() && auth == expected);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response();
    }

    match uri.path() {
        "/me" => Json(serde_json::json!({ "id": 1, "email": "user@example.com" })).into_response(),
        "/boom" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "database unavailable" })),
        )
            .into_response(),
        path => {
            let body: serde_json::Value =
                serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            Json(serde_json::json!({
                "method": method.as_str(),
                "path": path,
                "accept": header_string(&headers, header::ACCEPT),
                "body": body,
            }))
            .into_response()
        }
    }
}
