use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Json;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use coverdesk_client::{BackendConfig, GoTrueClient};
use coverdesk_core::MemoryStore;
use coverdesk_server::auth::AdminCache;
use coverdesk_server::routes;
use coverdesk_server::state::{AppState, Store};

pub const ADMIN_TOKEN: &str = "admin-token";
pub const EMPLOYEE_TOKEN: &str = "employee-token";
pub const ADMIN_ID: &str = "00000000-0000-4000-8000-0000000000aa";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    /// Token lookups that reached the fake auth backend.
    pub lookups: Arc<AtomicUsize>,
}

impl TestApp {
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

async fn user(State(lookups): State<Arc<AtomicUsize>>, headers: HeaderMap) -> Response {
    lookups.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let (email, role) = match bearer {
        Some(ADMIN_TOKEN) => ("admin@example.com", "admin"),
        Some(EMPLOYEE_TOKEN) => ("staff@example.com", "employee"),
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"code": 401, "msg": "invalid JWT: unable to parse or verify signature"})),
            )
                .into_response();
        }
    };

    Json(json!({
        "id": ADMIN_ID,
        "email": email,
        "user_metadata": {},
        "app_metadata": { "provider": "email", "role": role }
    }))
    .into_response()
}

async fn spawn_fake_auth(lookups: Arc<AtomicUsize>) -> GoTrueClient {
    let app = Router::new()
        .route("/auth/v1/user", get(user))
        .with_state(lookups);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = BackendConfig::new(&format!("http://{addr}"), "anon-key").unwrap();
    GoTrueClient::new(&config).unwrap()
}

/// App backed by the in-memory store and a fake auth backend.
pub async fn setup_test_app() -> TestApp {
    setup_with_cache(AdminCache::disabled()).await
}

pub async fn setup_with_cache(admin_cache: AdminCache) -> TestApp {
    let lookups = Arc::new(AtomicUsize::new(0));
    let auth = spawn_fake_auth(lookups.clone()).await;
    let store = MemoryStore::new();

    let state = Arc::new(AppState {
        store: Store::Memory(store.clone()),
        auth: Some(auth),
        admin_cache,
    });

    TestApp {
        router: routes::router(state),
        store,
        lookups,
    }
}

/// App without an auth backend: admin endpoints are disabled.
pub fn setup_test_app_no_auth() -> TestApp {
    let store = MemoryStore::new();
    let state = Arc::new(AppState {
        store: Store::Memory(store.clone()),
        auth: None,
        admin_cache: AdminCache::new(Duration::from_secs(60)),
    });

    TestApp {
        router: routes::router(state),
        store,
        lookups: Arc::new(AtomicUsize::new(0)),
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    authed(ADMIN_TOKEN, method, uri, body)
}

pub fn authed(token: &str, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn valid_quote_request() -> Value {
    json!({
        "fullName": "Maria Lopez",
        "email": "maria@example.com",
        "phone": "(555) 123-4567",
        "insuranceType": "property",
        "coverageAmount": "$350,000",
        "additionalInfo": "Two-story house"
    })
}

pub fn valid_client_info() -> Value {
    json!({
        "firstName": "Maria",
        "lastName": "Lopez",
        "email": "maria@example.com",
        "phone": "555-123-4567",
        "address": "12 Main St",
        "city": "Springfield",
        "state": "IL",
        "zipCode": "62701"
    })
}
