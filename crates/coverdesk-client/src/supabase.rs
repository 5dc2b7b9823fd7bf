use chrono::Utc;
use coverdesk_core::auth::{AuthEvent, AuthUser, Session};
use coverdesk_core::crm::{
    Activity, ActivityFilter, ClientRecord, CrmUser, NewActivity, NewCrmUser, Quote, QuoteFilter,
    QuoteStatus, QuoteUpdate, UserFilter, UserUpdate,
};
use coverdesk_core::models::{ClientSubmission, NewClientSubmission, NewQuoteRequest, QuoteRequest};
use coverdesk_core::traits::{AuthBackend, CrmStore, IdentityLookup, SubmissionStore};
use coverdesk_core::AppError;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::GoTrueClient;
use crate::config::BackendConfig;
use crate::rest::{Params, PostgrestClient, eq, ilike_any};

const CLIENT_SUBMISSIONS: &str = "client_submissions";
const QUOTE_REQUESTS: &str = "quote_requests";
const QUOTES: &str = "quotes";
const QUOTE_STATUSES: &str = "quote_statuses";
const CLIENTS: &str = "clients";
const USERS: &str = "users";
const ACTIVITIES: &str = "activities";

const QUOTE_SELECT: &str = "*,status:quote_statuses(*),client:clients(*)";
const ACTIVITY_SELECT: &str = "*,user:users(full_name,avatar_url),quote:quotes(title),client:clients(first_name,last_name)";

/// The hosted backend: auth plus data.
#[derive(Clone)]
pub struct SupabaseClient {
    auth: GoTrueClient,
    rest: PostgrestClient,
}

impl SupabaseClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        Ok(Self {
            auth: GoTrueClient::new(config)?,
            rest: PostgrestClient::new(config)?,
        })
    }

    pub fn from_env() -> Result<Self, AppError> {
        Self::new(&BackendConfig::from_env()?)
    }

    pub fn auth(&self) -> &GoTrueClient {
        &self.auth
    }

    pub fn rest(&self) -> &PostgrestClient {
        &self.rest
    }
}

fn by_id(id: Uuid) -> Params {
    vec![("id", eq(id))]
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

impl AuthBackend for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        self.auth.get_session().await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AppError> {
        self.auth.sign_in_with_password(email, password).await
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.auth.sign_out().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth.subscribe()
    }
}

impl IdentityLookup for SupabaseClient {
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AppError> {
        IdentityLookup::get_user(&self.auth, access_token).await
    }
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

impl SubmissionStore for SupabaseClient {
    async fn insert_client_submission(
        &self,
        submission: &NewClientSubmission,
    ) -> Result<ClientSubmission, AppError> {
        self.rest
            .insert(CLIENT_SUBMISSIONS, submission, &Params::new())
            .await
    }

    async fn insert_quote_request(
        &self,
        request: &NewQuoteRequest,
    ) -> Result<QuoteRequest, AppError> {
        self.rest.insert(QUOTE_REQUESTS, request, &Params::new()).await
    }

    async fn list_client_submissions(&self) -> Result<Vec<ClientSubmission>, AppError> {
        let params = vec![
            ("select", "*".to_string()),
            ("order", "submitted_at.desc".to_string()),
        ];
        self.rest.select(CLIENT_SUBMISSIONS, &params).await
    }

    async fn list_quote_requests(&self) -> Result<Vec<QuoteRequest>, AppError> {
        let params = vec![
            ("select", "*".to_string()),
            ("order", "submitted_at.desc".to_string()),
        ];
        self.rest.select(QUOTE_REQUESTS, &params).await
    }

    async fn delete_client_submission(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rest.delete(CLIENT_SUBMISSIONS, &by_id(id)).await? > 0)
    }

    async fn delete_quote_request(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rest.delete(QUOTE_REQUESTS, &by_id(id)).await? > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        let params = vec![("select", "id".to_string()), ("limit", "1".to_string())];
        self.rest
            .select::<serde_json::Value>(QUOTE_REQUESTS, &params)
            .await
            .map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// CRM
// ---------------------------------------------------------------------------

impl CrmStore for SupabaseClient {
    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, AppError> {
        let mut params = vec![
            ("select", QUOTE_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(id) = filter.status_id {
            params.push(("status_id", eq(id)));
        }
        if let Some(id) = filter.assigned_to {
            params.push(("assigned_to", eq(id)));
        }
        if let Some(ty) = filter.insurance_type {
            params.push(("insurance_type", eq(ty)));
        }
        self.rest.select(QUOTES, &params).await
    }

    async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>, AppError> {
        let mut params = by_id(id);
        params.push(("select", QUOTE_SELECT.to_string()));
        self.rest.select_one(QUOTES, &params).await
    }

    async fn update_quote(&self, id: Uuid, update: &QuoteUpdate) -> Result<Option<Quote>, AppError> {
        let mut body = serde_json::to_value(update)?;
        if let Some(map) = body.as_object_mut() {
            map.insert(
                "updated_at".to_string(),
                serde_json::Value::from(Utc::now().to_rfc3339()),
            );
        }

        let mut params = by_id(id);
        params.push(("select", QUOTE_SELECT.to_string()));
        let rows: Vec<Quote> = self.rest.update(QUOTES, &body, &params).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_quote_statuses(&self) -> Result<Vec<QuoteStatus>, AppError> {
        let params = vec![
            ("select", "*".to_string()),
            ("is_active", eq(true)),
            ("order", "sort_order.asc".to_string()),
        ];
        self.rest.select(QUOTE_STATUSES, &params).await
    }

    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<ClientRecord>, AppError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(or) = search.and_then(|term| {
            ilike_any(&["first_name", "last_name", "email"], term)
        }) {
            params.push(("or", or));
        }
        self.rest.select(CLIENTS, &params).await
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<CrmUser>, AppError> {
        let mut params = vec![
            ("select", "*".to_string()),
            ("is_active", eq(true)),
            ("order", "full_name.asc".to_string()),
        ];
        if let Some(role) = filter.role {
            params.push(("role", eq(role)));
        }
        if let Some(status) = filter.status {
            params.push(("status", eq(status)));
        }
        if let Some(or) = filter.search.as_deref().and_then(|term| {
            ilike_any(&["full_name", "email", "employee_id"], term)
        }) {
            params.push(("or", or));
        }
        self.rest.select(USERS, &params).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<CrmUser>, AppError> {
        self.rest.select_one(USERS, &by_id(id)).await
    }

    async fn create_user(&self, user: &NewCrmUser) -> Result<CrmUser, AppError> {
        self.rest.insert(USERS, user, &Params::new()).await
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<CrmUser>, AppError> {
        let rows: Vec<CrmUser> = self.rest.update(USERS, update, &by_id(id)).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.rest.delete(USERS, &by_id(id)).await? > 0)
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError> {
        let mut params = vec![
            ("select", ACTIVITY_SELECT.to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", filter.limit().to_string()),
        ];
        if let Some(id) = filter.quote_id {
            params.push(("quote_id", eq(id)));
        }
        if let Some(id) = filter.client_id {
            params.push(("client_id", eq(id)));
        }
        self.rest.select(ACTIVITIES, &params).await
    }

    async fn create_activity(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        let params = vec![("select", ACTIVITY_SELECT.to_string())];
        self.rest.insert(ACTIVITIES, activity, &params).await
    }
}
