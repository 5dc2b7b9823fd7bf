use coverdesk_client::{GoTrueClient, SupabaseClient};
use coverdesk_core::crm::{
    Activity, ActivityFilter, ClientRecord, CrmUser, NewActivity, NewCrmUser, Quote, QuoteFilter,
    QuoteStatus, QuoteUpdate, UserFilter, UserUpdate,
};
use coverdesk_core::models::{ClientSubmission, NewClientSubmission, NewQuoteRequest, QuoteRequest};
use coverdesk_core::traits::{CrmStore, SubmissionStore};
use coverdesk_core::{AppError, MemoryStore};
use uuid::Uuid;

use crate::auth::AdminCache;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub store: Store,
    /// Token lookup for the admin gate (None = admin endpoints disabled).
    pub auth: Option<GoTrueClient>,
    pub admin_cache: AdminCache,
}

/// Storage behind the handlers, chosen at startup.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Remote(SupabaseClient),
}

impl Store {
    pub fn kind(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Remote(_) => "remote",
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $method:ident($($arg:expr),*)) => {
        match $self {
            Store::Memory(store) => store.$method($($arg),*).await,
            Store::Remote(store) => store.$method($($arg),*).await,
        }
    };
}

impl SubmissionStore for Store {
    async fn insert_client_submission(
        &self,
        submission: &NewClientSubmission,
    ) -> Result<ClientSubmission, AppError> {
        dispatch!(self, insert_client_submission(submission))
    }

    async fn insert_quote_request(
        &self,
        request: &NewQuoteRequest,
    ) -> Result<QuoteRequest, AppError> {
        dispatch!(self, insert_quote_request(request))
    }

    async fn list_client_submissions(&self) -> Result<Vec<ClientSubmission>, AppError> {
        dispatch!(self, list_client_submissions())
    }

    async fn list_quote_requests(&self) -> Result<Vec<QuoteRequest>, AppError> {
        dispatch!(self, list_quote_requests())
    }

    async fn delete_client_submission(&self, id: Uuid) -> Result<bool, AppError> {
        dispatch!(self, delete_client_submission(id))
    }

    async fn delete_quote_request(&self, id: Uuid) -> Result<bool, AppError> {
        dispatch!(self, delete_quote_request(id))
    }

    async fn health_check(&self) -> Result<(), AppError> {
        dispatch!(self, health_check())
    }
}

impl CrmStore for Store {
    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, AppError> {
        dispatch!(self, list_quotes(filter))
    }

    async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>, AppError> {
        dispatch!(self, get_quote(id))
    }

    async fn update_quote(&self, id: Uuid, update: &QuoteUpdate) -> Result<Option<Quote>, AppError> {
        dispatch!(self, update_quote(id, update))
    }

    async fn list_quote_statuses(&self) -> Result<Vec<QuoteStatus>, AppError> {
        dispatch!(self, list_quote_statuses())
    }

    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<ClientRecord>, AppError> {
        dispatch!(self, list_clients(search))
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<CrmUser>, AppError> {
        dispatch!(self, list_users(filter))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<CrmUser>, AppError> {
        match self {
            Store::Memory(store) => CrmStore::get_user(store, id).await,
            Store::Remote(store) => CrmStore::get_user(store, id).await,
        }
    }

    async fn create_user(&self, user: &NewCrmUser) -> Result<CrmUser, AppError> {
        dispatch!(self, create_user(user))
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<CrmUser>, AppError> {
        dispatch!(self, update_user(id, update))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        dispatch!(self, delete_user(id))
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError> {
        dispatch!(self, list_activities(filter))
    }

    async fn create_activity(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        dispatch!(self, create_activity(activity))
    }
}
