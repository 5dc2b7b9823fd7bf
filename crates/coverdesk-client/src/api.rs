//! Client for the Coverdesk REST API.

use std::time::Duration;

use coverdesk_core::forms::{ClientInfoForm, QuoteRequestForm};
use coverdesk_core::models::{ClientSubmission, QuoteRequest, Submissions};
use coverdesk_core::stats::DashboardStats;
use coverdesk_core::validation::FieldError;
use coverdesk_core::AppError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::http::{read_json, send_error};

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const SESSION_EXPIRED: &str = "Session expired. Please log in again";

#[derive(Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    fields: Vec<FieldError>,
}

/// Result of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub store: String,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(concat!("coverdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Sends `token` as the bearer credential on admin requests.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorEnvelope>(&body).ok();
        let (message, fields) = match parsed {
            Some(ErrorEnvelope {
                message: Some(message),
                fields,
            }) => (message, fields),
            _ => (format!("HTTP {status_code}: {body}"), Vec::new()),
        };

        Err(match status {
            StatusCode::BAD_REQUEST if !fields.is_empty() => {
                AppError::ValidationError { message, fields }
            }
            StatusCode::UNAUTHORIZED => AppError::AuthError(SESSION_EXPIRED.to_string()),
            StatusCode::FORBIDDEN => AppError::Forbidden(message),
            StatusCode::NOT_FOUND => AppError::NotFound(message),
            _ => AppError::BackendError {
                message,
                status_code,
            },
        })
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, AppError> {
        let envelope: Envelope<T> = read_json(self.send(builder).await?).await?;
        envelope
            .data
            .ok_or_else(|| AppError::HttpError("Response carried no data".to_string()))
    }

    // -----------------------------------------------------------------------
    // Public
    // -----------------------------------------------------------------------

    /// Reports health even when the server answers 503.
    pub async fn health(&self) -> Result<HealthReport, AppError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .await
            .map_err(|e| send_error(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::SERVICE_UNAVAILABLE {
            return read_json(response).await;
        }
        Err(AppError::BackendError {
            message: format!("Health check failed with HTTP {status}"),
            status_code: status.as_u16(),
        })
    }

    pub async fn submit_client_info(
        &self,
        form: &ClientInfoForm,
    ) -> Result<ClientSubmission, AppError> {
        self.data(self.client.post(self.url("/api/client-info")).json(form))
            .await
    }

    pub async fn submit_quote_request(
        &self,
        form: &QuoteRequestForm,
    ) -> Result<QuoteRequest, AppError> {
        self.data(self.client.post(self.url("/api/quote-request")).json(form))
            .await
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    pub async fn submissions(&self) -> Result<Submissions, AppError> {
        self.data(self.authorized(self.client.get(self.url("/api/submissions"))))
            .await
    }

    pub async fn delete_client_submission(&self, id: Uuid) -> Result<(), AppError> {
        let path = format!("/api/client-submissions/{id}");
        self.send(self.authorized(self.client.delete(self.url(&path))))
            .await
            .map(|_| ())
    }

    pub async fn delete_quote_request(&self, id: Uuid) -> Result<(), AppError> {
        let path = format!("/api/quote-requests/{id}");
        self.send(self.authorized(self.client.delete(self.url(&path))))
            .await
            .map(|_| ())
    }

    pub async fn dashboard(&self) -> Result<DashboardStats, AppError> {
        self.data(self.authorized(self.client.get(self.url("/api/admin/dashboard"))))
            .await
    }
}
