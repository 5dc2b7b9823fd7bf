use coverdesk_core::auth::{AuthChange, login_failure_message};
use coverdesk_core::traits::{AuthBackend, IdentityLookup};
use coverdesk_core::AppError;

use coverdesk_client::{GoTrueClient, SupabaseClient};

use crate::integration::common::{
    ADMIN_EMAIL, ADMIN_TOKEN, EMPLOYEE_EMAIL, PASSWORD, REVOKED_EMAIL, SHORT_LIVED_EMAIL,
    spawn_fake_backend,
};

#[tokio::test]
async fn sign_in_stores_session_and_notifies() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();
    let mut events = client.subscribe();

    let session = client
        .sign_in_with_password(ADMIN_EMAIL, PASSWORD)
        .await
        .unwrap();

    assert!(session.user.is_admin());
    assert!(session.expires_at.is_some());
    assert_eq!(events.recv().await.unwrap().change, AuthChange::SignedIn);
    assert_eq!(
        client.get_session().await.unwrap().unwrap().access_token,
        ADMIN_TOKEN
    );
}

#[tokio::test]
async fn employee_session_is_not_admin() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();

    let session = client
        .sign_in_with_password(EMPLOYEE_EMAIL, PASSWORD)
        .await
        .unwrap();
    assert!(!session.user.is_admin());
}

#[tokio::test]
async fn bad_credentials_are_auth_errors() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();

    let err = client
        .sign_in_with_password(ADMIN_EMAIL, "wrong")
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::AuthError(ref msg) if msg == "Invalid login credentials"));
    assert_eq!(
        login_failure_message(&err),
        "Invalid email or password. Please try again."
    );
    assert!(client.current_session().is_none());
}

#[tokio::test]
async fn sign_out_clears_session_and_notifies() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();
    client
        .sign_in_with_password(ADMIN_EMAIL, PASSWORD)
        .await
        .unwrap();
    let mut events = client.subscribe();

    client.sign_out().await.unwrap();

    assert_eq!(events.recv().await.unwrap().change, AuthChange::SignedOut);
    assert!(client.get_session().await.unwrap().is_none());
    assert_eq!(*backend.state.logouts.lock().unwrap(), 1);
}

#[tokio::test]
async fn expired_session_is_refreshed() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();
    client
        .sign_in_with_password(SHORT_LIVED_EMAIL, PASSWORD)
        .await
        .unwrap();
    let mut events = client.subscribe();

    let session = client.get_session().await.unwrap().unwrap();

    assert_eq!(session.refresh_token, "refresh-2");
    assert_eq!(
        events.recv().await.unwrap().change,
        AuthChange::TokenRefreshed
    );
}

#[tokio::test]
async fn rejected_refresh_signs_out_locally() {
    let backend = spawn_fake_backend().await;
    let client = GoTrueClient::new(&backend.config).unwrap();
    client
        .sign_in_with_password(REVOKED_EMAIL, PASSWORD)
        .await
        .unwrap();
    let mut events = client.subscribe();

    assert!(client.get_session().await.unwrap().is_none());

    let event = events.recv().await.unwrap();
    assert_eq!(event.change, AuthChange::SignedOut);
    assert!(event.session.is_none());
    assert!(client.current_session().is_none());
}

#[tokio::test]
async fn token_lookup() {
    let backend = spawn_fake_backend().await;
    let client = SupabaseClient::new(&backend.config).unwrap();

    let user = IdentityLookup::get_user(&client, ADMIN_TOKEN).await.unwrap();
    assert!(user.is_admin());
    assert_eq!(user.email.as_deref(), Some(ADMIN_EMAIL));

    let err = IdentityLookup::get_user(&client, "forged").await.unwrap_err();
    assert!(matches!(err, AppError::AuthError(_)));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let config = coverdesk_client::BackendConfig::new("http://127.0.0.1:9", "anon").unwrap();
    let client = GoTrueClient::new(&config).unwrap();

    let err = client
        .sign_in_with_password(ADMIN_EMAIL, PASSWORD)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NetworkError(_)));
    assert_eq!(
        login_failure_message(&err),
        "Login failed. Please check your credentials and try again."
    );
}
