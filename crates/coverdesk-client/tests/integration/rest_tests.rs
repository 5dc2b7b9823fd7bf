use coverdesk_core::crm::UserFilter;
use coverdesk_core::models::{InsuranceType, NewQuoteRequest, PipelineStage};
use coverdesk_core::traits::{CrmStore, SubmissionStore};
use coverdesk_core::AppError;

use coverdesk_client::SupabaseClient;

use crate::integration::common::spawn_fake_backend;

fn new_request(name: &str) -> NewQuoteRequest {
    NewQuoteRequest {
        full_name: name.to_string(),
        email: "lead@example.com".into(),
        phone: "(555) 123-4567".into(),
        insurance_type: InsuranceType::Business,
        coverage_amount: Some("$2,000,000".into()),
        additional_info: None,
        status: PipelineStage::NewRequest,
    }
}

#[tokio::test]
async fn insert_list_and_delete_quote_requests() {
    let backend = spawn_fake_backend().await;
    let client = SupabaseClient::new(&backend.config).unwrap();

    let first = client
        .insert_quote_request(&new_request("First Lead"))
        .await
        .unwrap();
    client
        .insert_quote_request(&new_request("Second Lead"))
        .await
        .unwrap();
    assert_eq!(first.insurance_type, InsuranceType::Business);
    assert_eq!(first.status, PipelineStage::NewRequest);

    let listed = client.list_quote_requests().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].full_name, "Second Lead");

    let queries = backend.state.queries.lock().unwrap().clone();
    assert!(queries[0].1.contains("order=submitted_at.desc"));

    assert!(client.delete_quote_request(first.id).await.unwrap());
    assert!(!client.delete_quote_request(first.id).await.unwrap());
}

#[tokio::test]
async fn client_search_builds_or_filter() {
    let backend = spawn_fake_backend().await;
    let client = SupabaseClient::new(&backend.config).unwrap();

    client.list_clients(Some("lopez")).await.unwrap();
    client.list_clients(Some("   ")).await.unwrap();

    let queries = backend.state.queries.lock().unwrap().clone();
    assert!(queries[0].1.contains("or=%28first_name.ilike.*lopez*%2Clast_name"));
    assert!(!queries[1].1.contains("or="));
}

#[tokio::test]
async fn backend_failures_carry_message_and_status() {
    let backend = spawn_fake_backend().await;
    let client = SupabaseClient::new(&backend.config).unwrap();

    let err = client.list_users(&UserFilter::default()).await.unwrap_err();
    match err {
        AppError::BackendError {
            message,
            status_code,
        } => {
            assert_eq!(message, "relation is broken");
            assert_eq!(status_code, 500);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn health_check_round_trips() {
    let backend = spawn_fake_backend().await;
    let client = SupabaseClient::new(&backend.config).unwrap();
    client.health_check().await.unwrap();
}
