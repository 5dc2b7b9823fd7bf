use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::integration::common::{
    post_json, send, setup_test_app, valid_client_info, valid_quote_request,
};

#[tokio::test]
async fn root_banner() {
    let app = setup_test_app().await;

    let (status, json) = send(&app.router, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Insurance Services API is running");
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, json) =
        send(&app.router, Request::get("/health").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["store"], "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        Request::get("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/quote-request"].is_object());
    let bearer = &json["components"]["securitySchemes"]["bearer"];
    assert!(bearer.is_object());
    assert!(
        bearer["description"]
            .as_str()
            .unwrap()
            .contains("COVERDESK_ADMIN_CACHE_TTL_SECS")
    );
}

#[tokio::test]
async fn quote_request_is_stored_with_new_request_status() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        post_json("/api/quote-request", valid_quote_request()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Quote request submitted successfully");
    assert_eq!(json["data"]["full_name"], "Maria Lopez");
    assert_eq!(json["data"]["insurance_type"], "property");
    assert_eq!(json["data"]["status"], "new_request");
    assert!(json["data"]["id"].is_string());
}

#[tokio::test]
async fn client_info_is_stored() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        post_json("/api/client-info", valid_client_info()),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["message"], "Client information submitted successfully");
    assert_eq!(json["data"]["zip_code"], "62701");
    assert!(json["data"]["date_of_birth"].is_null());
}

#[tokio::test]
async fn blank_fields_are_reported_per_field() {
    let app = setup_test_app().await;

    let (status, json) = send(
        &app.router,
        post_json(
            "/api/quote-request",
            json!({"fullName": "   ", "email": "not-an-email", "phone": "12", "insuranceType": "pet"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["message"], "Please fill in all required fields correctly");

    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["email", "full_name", "insurance_type", "phone"]);
}

#[tokio::test]
async fn invalid_zip_is_rejected() {
    let app = setup_test_app().await;
    let mut body = valid_client_info();
    body["zipCode"] = json!("6270");

    let (status, json) = send(&app.router, post_json("/api/client-info", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "zip_code");
    assert_eq!(json["fields"][0]["message"], "Please enter a valid ZIP code");
}

#[tokio::test]
async fn malformed_json_is_serialization_error() {
    let app = setup_test_app().await;

    let request = Request::post("/api/client-info")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "serialization_error");
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = setup_test_app().await;
    let mut body = valid_quote_request();
    body["additionalInfo"] = json!("x".repeat(128 * 1024));
    let body = body.to_string();

    let request = Request::post("/api/quote-request")
        .header("content-type", "application/json")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
