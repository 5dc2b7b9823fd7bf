//! Fake hosted backend served by axum on an ephemeral port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};

use coverdesk_client::BackendConfig;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const EMPLOYEE_EMAIL: &str = "staff@example.com";
pub const PASSWORD: &str = "secret";
pub const ADMIN_TOKEN: &str = "admin-token";

/// Accounts whose sessions come back already expired.
pub const SHORT_LIVED_EMAIL: &str = "short@example.com";
pub const REVOKED_EMAIL: &str = "revoked@example.com";

pub const ADMIN_ID: &str = "00000000-0000-4000-8000-000000000001";

#[derive(Clone, Default)]
pub struct FakeState {
    pub quote_requests: Arc<Mutex<Vec<Value>>>,
    /// Raw query strings seen by the data API, per table.
    pub queries: Arc<Mutex<Vec<(String, String)>>>,
    pub logouts: Arc<Mutex<usize>>,
}

pub struct FakeBackend {
    pub config: BackendConfig,
    pub state: FakeState,
}

fn user_json(email: &str) -> Value {
    let role = if email == EMPLOYEE_EMAIL { "employee" } else { "admin" };
    json!({
        "id": ADMIN_ID,
        "email": email,
        "user_metadata": {},
        "app_metadata": { "provider": "email", "role": role }
    })
}

fn session_json(email: &str, expires_in: i64, refresh_token: &str) -> Value {
    json!({
        "access_token": ADMIN_TOKEN,
        "token_type": "bearer",
        "expires_in": expires_in,
        "refresh_token": refresh_token,
        "user": user_json(email)
    })
}

fn invalid_grant() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })),
    )
        .into_response()
}

async fn token(
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    match query.get("grant_type").map(String::as_str) {
        Some("password") => {
            let email = body["email"].as_str().unwrap_or_default();
            let password = body["password"].as_str().unwrap_or_default();
            if password != PASSWORD {
                return invalid_grant();
            }
            match email {
                ADMIN_EMAIL | EMPLOYEE_EMAIL => Json(session_json(email, 3600, "refresh-1")).into_response(),
                SHORT_LIVED_EMAIL => Json(session_json(email, 0, "good-refresh")).into_response(),
                REVOKED_EMAIL => Json(session_json(email, 0, "revoked-refresh")).into_response(),
                _ => invalid_grant(),
            }
        }
        Some("refresh_token") => match body["refresh_token"].as_str() {
            Some("good-refresh") => {
                Json(session_json(SHORT_LIVED_EMAIL, 3600, "refresh-2")).into_response()
            }
            _ => (
                StatusCode::BAD_REQUEST,
                Json(json!({"code": 400, "msg": "Invalid Refresh Token: Refresh Token Not Found"})),
            )
                .into_response(),
        },
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn logout(State(state): State<FakeState>) -> StatusCode {
    *state.logouts.lock().unwrap() += 1;
    StatusCode::NO_CONTENT
}

async fn user(headers: HeaderMap) -> Response {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match bearer {
        Some(ADMIN_TOKEN) => Json(user_json(ADMIN_EMAIL)).into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"code": 401, "msg": "invalid JWT: unable to parse or verify signature"})),
        )
            .into_response(),
    }
}

async fn list_quote_requests(State(state): State<FakeState>, RawQuery(query): RawQuery) -> Json<Value> {
    state
        .queries
        .lock()
        .unwrap()
        .push(("quote_requests".into(), query.unwrap_or_default()));
    let rows = state.quote_requests.lock().unwrap().clone();
    Json(Value::Array(rows.into_iter().rev().collect()))
}

async fn insert_quote_request(
    State(state): State<FakeState>,
    Json(mut body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    body["id"] = json!(uuid::Uuid::new_v4());
    body["submitted_at"] = json!("2026-03-01T12:00:00Z");
    state.quote_requests.lock().unwrap().push(body.clone());
    (StatusCode::CREATED, Json(json!([body])))
}

async fn delete_quote_request(
    State(state): State<FakeState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let id = query
        .get("id")
        .and_then(|f| f.strip_prefix("eq."))
        .unwrap_or_default()
        .to_string();
    let mut rows = state.quote_requests.lock().unwrap();
    let (removed, kept): (Vec<Value>, Vec<Value>) =
        rows.drain(..).partition(|row| row["id"].as_str() == Some(id.as_str()));
    *rows = kept;
    Json(Value::Array(removed))
}

async fn list_clients(State(state): State<FakeState>, RawQuery(query): RawQuery) -> Json<Value> {
    state
        .queries
        .lock()
        .unwrap()
        .push(("clients".into(), query.unwrap_or_default()));
    Json(json!([]))
}

async fn failing_table() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"code": "XX000", "message": "relation is broken"})),
    )
        .into_response()
}

pub async fn spawn_fake_backend() -> FakeBackend {
    let state = FakeState::default();

    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(user))
        .route(
            "/rest/v1/quote_requests",
            get(list_quote_requests)
                .post(insert_quote_request)
                .delete(delete_quote_request),
        )
        .route("/rest/v1/clients", get(list_clients))
        .route("/rest/v1/users", get(failing_table))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = BackendConfig::new(&format!("http://{addr}"), "anon-key")
        .unwrap()
        .with_service_role_key("service-key");

    FakeBackend { config, state }
}

/// Serves a fixed response for every request to the Coverdesk API paths.
pub async fn spawn_fake_api(status: StatusCode, body: Value) -> String {
    let handler = move || {
        let body = body.clone();
        async move { (status, Json(body)) }
    };
    let app = Router::new().fallback(handler);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
