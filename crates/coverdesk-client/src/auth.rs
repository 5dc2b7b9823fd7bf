//! Client for the backend's auth API (`/auth/v1`).
//!
//! Holds the current session for an interactive client and broadcasts
//! auth-state changes to subscribers. Also answers bearer-token lookups for
//! the server's admin gate.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use coverdesk_core::auth::{AuthChange, AuthEvent, AuthUser, Session};
use coverdesk_core::traits::{AuthBackend, IdentityLookup};
use coverdesk_core::AppError;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::BackendConfig;
use crate::http::{error_parts, read_json, send_error};

/// Refresh this many seconds before the access token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Clone)]
pub struct GoTrueClient {
    client: Client,
    base_url: String,
    anon_key: String,
    timeout_secs: u64,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl GoTrueClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;
        let (events, _) = broadcast::channel(32);

        Ok(Self {
            client,
            base_url: config.auth_url(),
            anon_key: config.anon_key.clone(),
            timeout_secs: config.timeout.as_secs(),
            session: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// The stored session, without refreshing it.
    pub fn current_session(&self) -> Option<Session> {
        self.read_session().clone()
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned session lock");
            poisoned.into_inner()
        })
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.session.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned session lock");
            poisoned.into_inner()
        })
    }

    fn store(&self, change: AuthChange, session: Option<Session>) {
        *self.write_session() = session.clone();
        // No subscribers is fine.
        let _ = self.events.send(AuthEvent { change, session });
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.anon_key)
    }

    async fn token_grant<B: Serialize>(&self, grant_type: &str, body: &B) -> Result<Session, AppError> {
        let url = format!("{}/token", self.base_url);
        let response = self
            .request(self.client.post(&url))
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let (status_code, message) = error_parts(response).await;
            // The token endpoint reports bad credentials as 400.
            return Err(if status.is_client_error() {
                AppError::AuthError(message)
            } else {
                AppError::BackendError {
                    message,
                    status_code,
                }
            });
        }

        let session: Session = read_json(response).await?;
        Ok(session.anchored_at(Utc::now()))
    }

    /// Exchanges the stored refresh token for a new session.
    pub async fn refresh_session(&self) -> Result<Session, AppError> {
        let refresh_token = self
            .read_session()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or_else(|| AppError::AuthError("No session to refresh".into()))?;

        let session = self
            .token_grant(
                "refresh_token",
                &RefreshGrant {
                    refresh_token: &refresh_token,
                },
            )
            .await?;
        tracing::debug!(user_id = %session.user.id, "Session refreshed");
        self.store(AuthChange::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }
}

impl AuthBackend for GoTrueClient {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        let current = self.current_session();
        let Some(session) = current else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now(), EXPIRY_MARGIN_SECS) {
            return Ok(Some(session));
        }

        match self.refresh_session().await {
            Ok(session) => Ok(Some(session)),
            Err(e @ (AppError::AuthError(_) | AppError::BackendError { .. })) => {
                tracing::warn!(error = %e, "Session refresh rejected, signing out locally");
                self.store(AuthChange::SignedOut, None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let session = self
            .token_grant("password", &PasswordGrant { email, password })
            .await?;
        tracing::info!(user_id = %session.user.id, "Signed in");
        self.store(AuthChange::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        let token = self.read_session().as_ref().map(|s| s.access_token.clone());

        if let Some(token) = token {
            let url = format!("{}/logout", self.base_url);
            let response = self
                .request(self.client.post(&url))
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| send_error(e, self.timeout_secs))?;

            let status = response.status();
            // An already-invalid token still ends the local session.
            let token_gone = matches!(
                status,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            );
            if !status.is_success() && !token_gone {
                let (status_code, message) = error_parts(response).await;
                return Err(AppError::BackendError {
                    message,
                    status_code,
                });
            }
        }

        tracing::info!("Signed out");
        self.store(AuthChange::SignedOut, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

impl IdentityLookup for GoTrueClient {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .request(self.client.get(&url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let (status_code, message) = error_parts(response).await;
            return Err(
                if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                    AppError::AuthError(message)
                } else {
                    AppError::BackendError {
                        message,
                        status_code,
                    }
                },
            );
        }

        read_json(response).await
    }
}
