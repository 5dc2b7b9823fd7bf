use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use coverdesk_client::ApiClient;
use coverdesk_client::api::SESSION_EXPIRED;
use coverdesk_core::forms::QuoteRequestForm;
use coverdesk_core::AppError;

use crate::integration::common::spawn_fake_api;

#[tokio::test]
async fn unauthorized_maps_to_session_expired() {
    let url = spawn_fake_api(
        StatusCode::UNAUTHORIZED,
        json!({"success": false, "error": "unauthorized", "message": "Missing bearer token"}),
    )
    .await;
    let client = ApiClient::new(&url).unwrap().with_token("stale");

    let err = client.submissions().await.unwrap_err();
    assert!(matches!(err, AppError::AuthError(ref msg) if msg == SESSION_EXPIRED));
}

#[tokio::test]
async fn forbidden_keeps_server_message() {
    let url = spawn_fake_api(
        StatusCode::FORBIDDEN,
        json!({
            "success": false,
            "error": "forbidden",
            "message": "Access denied. Admin privileges required."
        }),
    )
    .await;
    let client = ApiClient::new(&url).unwrap().with_token("employee");

    let err = client.dashboard().await.unwrap_err();
    assert!(
        matches!(err, AppError::Forbidden(ref msg) if msg == "Access denied. Admin privileges required.")
    );
}

#[tokio::test]
async fn validation_errors_carry_fields() {
    let url = spawn_fake_api(
        StatusCode::BAD_REQUEST,
        json!({
            "success": false,
            "error": "validation_error",
            "message": "Please fill in all required fields correctly",
            "fields": [{"field": "email", "message": "Email is required"}]
        }),
    )
    .await;
    let client = ApiClient::new(&url).unwrap();

    let err = client
        .submit_quote_request(&QuoteRequestForm::default())
        .await
        .unwrap_err();
    match err {
        AppError::ValidationError { message, fields } => {
            assert_eq!(message, "Please fill in all required fields correctly");
            assert_eq!(fields[0].field, "email");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn delete_not_found() {
    let url = spawn_fake_api(
        StatusCode::NOT_FOUND,
        json!({"success": false, "error": "not_found", "message": "Not found: quote request"}),
    )
    .await;
    let client = ApiClient::new(&url).unwrap().with_token("admin");

    let err = client.delete_quote_request(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn unhealthy_report_is_not_an_error() {
    let url = spawn_fake_api(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"success": false, "status": "unhealthy", "store": "error"}),
    )
    .await;
    let client = ApiClient::new(&url).unwrap();

    let report = client.health().await.unwrap();
    assert!(!report.is_healthy());
    assert_eq!(report.store, "error");
}
