use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{TimeDelta, Utc};
use serde_json::json;
use uuid::Uuid;

use coverdesk_core::crm::{ClientRecord, Quote};
use coverdesk_core::models::InsuranceType;
use coverdesk_core::MemoryStore;
use coverdesk_server::auth::AdminCache;

use crate::integration::common::{
    ADMIN_ID, EMPLOYEE_TOKEN, admin, authed, post_json, send, setup_test_app,
    setup_test_app_no_auth, setup_with_cache, valid_client_info, valid_quote_request,
};

fn seed_quote(store: &MemoryStore, stage: &str, premium: f64, coverage: f64, ty: InsuranceType) -> Uuid {
    let status = store.status_named(stage).unwrap();
    let id = Uuid::new_v4();
    store.seed_quote(Quote {
        id,
        title: format!("{stage} quote"),
        client_id: None,
        assigned_to: None,
        status_id: Some(status.id),
        insurance_type: Some(ty),
        coverage_amount: Some(coverage),
        premium_amount: Some(premium),
        priority: None,
        created_at: Utc::now(),
        updated_at: None,
        status: None,
        client: None,
    });
    id
}

fn seed_client(store: &MemoryStore, first: &str, last: &str, email: &str) {
    store.seed_client(ClientRecord {
        id: Uuid::new_v4(),
        first_name: first.into(),
        last_name: last.into(),
        email: Some(email.into()),
        phone: None,
        address: None,
        city: None,
        state: None,
        zip_code: None,
        created_at: Utc::now() - TimeDelta::days(1),
    });
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_returns_401() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        Request::get("/api/submissions").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "unauthorized");
    assert_eq!(app.lookups(), 0);
}

#[tokio::test]
async fn malformed_authorization_returns_401() {
    let app = setup_test_app().await;

    let request = Request::get("/api/submissions")
        .header("authorization", "Token admin-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn rejected_token_returns_401() {
    let app = setup_test_app().await;

    let (status, json) = send(&app.router, authed("forged", "GET", "/api/submissions", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "unauthorized");
    assert_eq!(app.lookups(), 1);
}

#[tokio::test]
async fn non_admin_returns_403() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        authed(EMPLOYEE_TOKEN, "GET", "/api/admin/dashboard", None),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
    assert_eq!(json["message"], "Access denied. Admin privileges required.");
}

#[tokio::test]
async fn no_auth_backend_returns_403() {
    let app = setup_test_app_no_auth();

    let (status, json) = send(&app.router, admin("GET", "/api/submissions", None)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn public_routes_do_not_need_a_token() {
    let app = setup_test_app_no_auth();

    let (status, _) = send(
        &app.router,
        post_json("/api/quote-request", valid_quote_request()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn verified_tokens_are_cached() {
    let app = setup_with_cache(AdminCache::new(Duration::from_secs(60))).await;

    for _ in 0..3 {
        let (status, _) = send(&app.router, admin("GET", "/api/submissions", None)).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(app.lookups(), 1);

    let uncached = setup_test_app().await;
    for _ in 0..3 {
        send(&uncached.router, admin("GET", "/api/submissions", None)).await;
    }
    assert_eq!(uncached.lookups(), 3);
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submissions_list_and_delete() {
    let app = setup_test_app().await;

    send(&app.router, post_json("/api/client-info", valid_client_info())).await;
    let mut second = valid_quote_request();
    second["fullName"] = json!("Second Lead");
    send(&app.router, post_json("/api/quote-request", valid_quote_request())).await;
    send(&app.router, post_json("/api/quote-request", second)).await;

    let (status, json) = send(&app.router, admin("GET", "/api/submissions", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["client_submissions"].as_array().unwrap().len(), 1);
    let quotes = json["data"]["quote_requests"].as_array().unwrap();
    assert_eq!(quotes.len(), 2);
    assert_eq!(quotes[0]["full_name"], "Second Lead");

    let id = quotes[0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/quote-requests/{id}");
    let (status, body) = send(&app.router, admin("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, json) = send(&app.router, admin("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not_found");

    let client_id = Uuid::new_v4();
    let (status, _) = send(
        &app.router,
        admin("DELETE", &format!("/api/client-submissions/{client_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Dashboard and quotes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dashboard_aggregates_pipeline() {
    let app = setup_test_app().await;
    seed_quote(&app.store, "closed_won", 1200.0, 500_000.0, InsuranceType::Auto);
    seed_quote(&app.store, "closed_lost", 900.0, 100_000.0, InsuranceType::Life);
    seed_quote(&app.store, "new_request", 0.0, 0.0, InsuranceType::Auto);

    let (status, json) = send(&app.router, admin("GET", "/api/admin/dashboard", None)).await;

    assert_eq!(status, StatusCode::OK);
    let stats = &json["data"];
    assert_eq!(stats["total_quotes"], 3);
    assert_eq!(stats["active_quotes"], 1);
    assert_eq!(stats["won_quotes"], 1);
    assert_eq!(stats["lost_quotes"], 1);
    assert_eq!(stats["total_revenue"], 1200.0);
    assert_eq!(stats["total_coverage"], 500_000.0);
    assert_eq!(stats["win_rate"], 50);
    assert_eq!(stats["pipeline"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn quotes_filter_get_and_update() {
    let app = setup_test_app().await;
    let auto_id = seed_quote(&app.store, "new_request", 0.0, 0.0, InsuranceType::Auto);
    seed_quote(&app.store, "new_request", 0.0, 0.0, InsuranceType::Life);

    let (_, json) = send(
        &app.router,
        admin("GET", "/api/admin/quotes?insurance_type=auto", None),
    )
    .await;
    let quotes = json["data"].as_array().unwrap();
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0]["id"], auto_id.to_string());
    assert_eq!(quotes[0]["status"]["name"], "new_request");

    let quoted = app.store.status_named("quoted").unwrap();
    let uri = format!("/api/admin/quotes/{auto_id}");
    let (status, json) = send(
        &app.router,
        admin(
            "PATCH",
            &uri,
            Some(json!({"status_id": quoted.id, "premium_amount": 450.5})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"]["name"], "quoted");
    assert_eq!(json["data"]["premium_amount"], 450.5);

    let (status, json) = send(&app.router, admin("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status_id"], quoted.id.to_string());

    let missing = format!("/api/admin/quotes/{}", Uuid::new_v4());
    let (status, _) = send(&app.router, admin("GET", &missing, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn statuses_are_ordered() {
    let app = setup_test_app().await;

    let (_, json) = send(&app.router, admin("GET", "/api/admin/quote-statuses", None)).await;

    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        ["new_request", "contacted", "quoted", "closed_won", "closed_lost"]
    );
}

#[tokio::test]
async fn clients_search() {
    let app = setup_test_app().await;
    seed_client(&app.store, "Maria", "Lopez", "maria@example.com");
    seed_client(&app.store, "John", "Smith", "john@example.com");

    let (_, json) = send(&app.router, admin("GET", "/api/admin/clients?search=lop", None)).await;
    let clients = json["data"].as_array().unwrap();
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0]["last_name"], "Lopez");

    let (_, json) = send(&app.router, admin("GET", "/api/admin/clients", None)).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_directory_crud() {
    let app = setup_test_app().await;

    for (email, name, role) in [
        ("zoe@example.com", "Zoe Adams", "employee"),
        ("abe@example.com", "Abe Brown", "vendor"),
    ] {
        let (status, json) = send(
            &app.router,
            admin(
                "POST",
                "/api/admin/users",
                Some(json!({"email": email, "fullName": name, "role": role})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["data"]["role"], role);
    }

    let (status, json) = send(
        &app.router,
        admin(
            "POST",
            "/api/admin/users",
            Some(json!({"email": "ZOE@example.com", "fullName": "Zoe Again", "role": "employee"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "email");

    let (_, json) = send(
        &app.router,
        admin("GET", "/api/admin/users?per_page=1&page=2", None),
    )
    .await;
    let page = &json["data"];
    assert_eq!(page["total"], 2);
    assert_eq!(page["total_pages"], 2);
    assert_eq!(page["users"][0]["full_name"], "Zoe Adams");

    let (_, json) = send(&app.router, admin("GET", "/api/admin/users?role=vendor", None)).await;
    assert_eq!(json["data"]["total"], 1);
    let id = json["data"]["users"][0]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/admin/users/{id}");

    let (status, json) = send(
        &app.router,
        admin("PATCH", &uri, Some(json!({"job_title": "Broker", "status": "inactive"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "inactive");

    let (status, _) = send(
        &app.router,
        admin("PATCH", &uri, Some(json!({"full_name": "  "}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app.router, admin("DELETE", &uri, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app.router, admin("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_user_form_is_rejected() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        admin("POST", "/api/admin/users", Some(json!({"email": "a@b.co", "fullName": "A B"}))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "role");
    assert_eq!(json["fields"][0]["message"], "Please select a role");
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[tokio::test]
async fn activity_is_logged_as_caller() {
    let app = setup_test_app().await;
    let quote_id = seed_quote(&app.store, "contacted", 0.0, 0.0, InsuranceType::Health);

    let (status, json) = send(
        &app.router,
        admin(
            "POST",
            "/api/admin/activities",
            Some(json!({"quoteId": quote_id, "activityType": "call", "description": "Left voicemail"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["user_id"], ADMIN_ID);
    assert_eq!(json["data"]["quote"]["title"], "contacted quote");

    let (_, json) = send(
        &app.router,
        admin("GET", &format!("/api/admin/activities?quote_id={quote_id}"), None),
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = send(
        &app.router,
        admin("GET", &format!("/api/admin/activities?quote_id={}", Uuid::new_v4()), None),
    )
    .await;
    assert!(json["data"].as_array().unwrap().is_empty());

    let (status, json) = send(
        &app.router,
        admin("POST", "/api/admin/activities", Some(json!({"activity_type": " "}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "activity_type");
}

// ---------------------------------------------------------------------------
// Malformed ids and query strings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_path_id_uses_error_envelope() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        admin("DELETE", "/api/quote-requests/not-a-uuid", None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["fields"][0]["field"], "id");
}

#[tokio::test]
async fn malformed_query_value_uses_error_envelope() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        admin("GET", "/api/admin/quotes?status_id=abc", None),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "validation_error");
    assert!(json["message"].as_str().unwrap().starts_with("Failed to deserialize query string"));
}
