//! Process-local store for development and tests.
//!
//! Data lives for the lifetime of the process. Joins that the hosted data
//! API performs (quote status and client, activity references) are done
//! here on read.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::crm::{
    Activity, ActivityActor, ActivityClientRef, ActivityFilter, ActivityQuoteRef, ClientRecord,
    CrmUser, NewActivity, NewCrmUser, Quote, QuoteFilter, QuoteStatus, QuoteUpdate, UserFilter,
    UserUpdate,
};
use crate::error::AppError;
use crate::models::{ClientSubmission, NewClientSubmission, NewQuoteRequest, QuoteRequest};
use crate::traits::{CrmStore, SubmissionStore};

#[derive(Default)]
struct MemoryInner {
    client_submissions: Vec<ClientSubmission>,
    quote_requests: Vec<QuoteRequest>,
    statuses: Vec<QuoteStatus>,
    quotes: Vec<Quote>,
    clients: Vec<ClientRecord>,
    users: Vec<CrmUser>,
    activities: Vec<Activity>,
}

impl MemoryInner {
    fn joined_quote(&self, quote: &Quote) -> Quote {
        let mut quote = quote.clone();
        quote.status = quote
            .status_id
            .and_then(|id| self.statuses.iter().find(|s| s.id == id).cloned());
        quote.client = quote
            .client_id
            .and_then(|id| self.clients.iter().find(|c| c.id == id).cloned());
        quote
    }

    fn joined_activity(&self, activity: &Activity) -> Activity {
        let mut activity = activity.clone();
        activity.user = activity
            .user_id
            .and_then(|id| self.users.iter().find(|u| u.id == id))
            .map(|u| ActivityActor {
                full_name: u.full_name.clone(),
                avatar_url: u.avatar_url.clone(),
            });
        activity.quote = activity
            .quote_id
            .and_then(|id| self.quotes.iter().find(|q| q.id == id))
            .map(|q| ActivityQuoteRef {
                title: q.title.clone(),
            });
        activity.client = activity
            .client_id
            .and_then(|id| self.clients.iter().find(|c| c.id == id))
            .map(|c| ActivityClientRef {
                first_name: c.first_name.clone(),
                last_name: c.last_name.clone(),
            });
        activity
    }
}

/// In-memory implementation of [`SubmissionStore`] and [`CrmStore`].
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the default pipeline statuses.
    pub fn new() -> Self {
        let inner = MemoryInner {
            statuses: QuoteStatus::defaults(),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("Recovered from poisoned memory store mutex");
            poisoned.into_inner()
        })
    }

    pub fn statuses(&self) -> Vec<QuoteStatus> {
        self.lock_inner().statuses.clone()
    }

    /// Looks up a status by its `name`.
    pub fn status_named(&self, name: &str) -> Option<QuoteStatus> {
        self.lock_inner()
            .statuses
            .iter()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn seed_client(&self, client: ClientRecord) {
        self.lock_inner().clients.push(client);
    }

    pub fn seed_quote(&self, quote: Quote) {
        self.lock_inner().quotes.push(quote);
    }

    pub fn seed_user(&self, user: CrmUser) {
        self.lock_inner().users.push(user);
    }
}

/// Newest first; ties keep reverse insertion order.
fn newest_first<T: Clone, K: Ord>(items: &[T], key: impl Fn(&T) -> K) -> Vec<T> {
    let mut out: Vec<T> = items.iter().rev().cloned().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

impl SubmissionStore for MemoryStore {
    async fn insert_client_submission(
        &self,
        submission: &NewClientSubmission,
    ) -> Result<ClientSubmission, AppError> {
        let stored = ClientSubmission {
            id: Uuid::new_v4(),
            first_name: submission.first_name.clone(),
            last_name: submission.last_name.clone(),
            email: submission.email.clone(),
            phone: submission.phone.clone(),
            date_of_birth: submission.date_of_birth.clone(),
            address: submission.address.clone(),
            city: submission.city.clone(),
            state: submission.state.clone(),
            zip_code: submission.zip_code.clone(),
            submitted_at: Utc::now(),
        };
        self.lock_inner().client_submissions.push(stored.clone());
        Ok(stored)
    }

    async fn insert_quote_request(
        &self,
        request: &NewQuoteRequest,
    ) -> Result<QuoteRequest, AppError> {
        let stored = QuoteRequest {
            id: Uuid::new_v4(),
            full_name: request.full_name.clone(),
            email: request.email.clone(),
            phone: request.phone.clone(),
            insurance_type: request.insurance_type,
            coverage_amount: request.coverage_amount.clone(),
            additional_info: request.additional_info.clone(),
            status: request.status,
            submitted_at: Utc::now(),
        };
        self.lock_inner().quote_requests.push(stored.clone());
        Ok(stored)
    }

    async fn list_client_submissions(&self) -> Result<Vec<ClientSubmission>, AppError> {
        let inner = self.lock_inner();
        Ok(newest_first(&inner.client_submissions, |s| s.submitted_at))
    }

    async fn list_quote_requests(&self) -> Result<Vec<QuoteRequest>, AppError> {
        let inner = self.lock_inner();
        Ok(newest_first(&inner.quote_requests, |r| r.submitted_at))
    }

    async fn delete_client_submission(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.lock_inner();
        let before = inner.client_submissions.len();
        inner.client_submissions.retain(|s| s.id != id);
        Ok(inner.client_submissions.len() != before)
    }

    async fn delete_quote_request(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.lock_inner();
        let before = inner.quote_requests.len();
        inner.quote_requests.retain(|r| r.id != id);
        Ok(inner.quote_requests.len() != before)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

impl CrmStore for MemoryStore {
    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, AppError> {
        let inner = self.lock_inner();
        let matching: Vec<Quote> = inner
            .quotes
            .iter()
            .filter(|q| filter.matches(q))
            .map(|q| inner.joined_quote(q))
            .collect();
        Ok(newest_first(&matching, |q| q.created_at))
    }

    async fn get_quote(&self, id: Uuid) -> Result<Option<Quote>, AppError> {
        let inner = self.lock_inner();
        Ok(inner
            .quotes
            .iter()
            .find(|q| q.id == id)
            .map(|q| inner.joined_quote(q)))
    }

    async fn update_quote(&self, id: Uuid, update: &QuoteUpdate) -> Result<Option<Quote>, AppError> {
        let mut inner = self.lock_inner();
        let Some(quote) = inner.quotes.iter_mut().find(|q| q.id == id) else {
            return Ok(None);
        };
        update.apply_to(quote);
        quote.updated_at = Some(Utc::now());
        let updated = quote.clone();
        Ok(Some(inner.joined_quote(&updated)))
    }

    async fn list_quote_statuses(&self) -> Result<Vec<QuoteStatus>, AppError> {
        let mut statuses: Vec<QuoteStatus> = self
            .lock_inner()
            .statuses
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect();
        statuses.sort_by_key(|s| s.sort_order);
        Ok(statuses)
    }

    async fn list_clients(&self, search: Option<&str>) -> Result<Vec<ClientRecord>, AppError> {
        let inner = self.lock_inner();
        let matching: Vec<ClientRecord> = inner
            .clients
            .iter()
            .filter(|c| search.is_none_or(|term| c.matches_search(term)))
            .cloned()
            .collect();
        Ok(newest_first(&matching, |c| c.created_at))
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<CrmUser>, AppError> {
        let mut users: Vec<CrmUser> = self
            .lock_inner()
            .users
            .iter()
            .filter(|u| u.is_active && filter.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<CrmUser>, AppError> {
        Ok(self.lock_inner().users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, user: &NewCrmUser) -> Result<CrmUser, AppError> {
        let mut inner = self.lock_inner();
        if inner
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::invalid_field(
                "email",
                "A user with this email already exists",
            ));
        }

        let created = CrmUser {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            department: user.department.clone(),
            job_title: user.job_title.clone(),
            employee_id: user.employee_id.clone(),
            phone: user.phone.clone(),
            vendor_company_name: user.vendor_company_name.clone(),
            vendor_type: user.vendor_type.clone(),
            status: user.status,
            timezone: Some(user.timezone.clone()),
            preferred_language: Some(user.preferred_language.clone()),
            is_active: true,
            avatar_url: None,
            created_at: Utc::now(),
        };
        inner.users.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: Uuid, update: &UserUpdate) -> Result<Option<CrmUser>, AppError> {
        let mut inner = self.lock_inner();
        Ok(inner.users.iter_mut().find(|u| u.id == id).map(|user| {
            update.apply_to(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, AppError> {
        let mut inner = self.lock_inner();
        let before = inner.users.len();
        inner.users.retain(|u| u.id != id);
        Ok(inner.users.len() != before)
    }

    async fn list_activities(&self, filter: &ActivityFilter) -> Result<Vec<Activity>, AppError> {
        let inner = self.lock_inner();
        let matching: Vec<Activity> = inner
            .activities
            .iter()
            .filter(|a| filter.matches(a))
            .map(|a| inner.joined_activity(a))
            .collect();
        let mut sorted = newest_first(&matching, |a| a.created_at);
        sorted.truncate(filter.limit());
        Ok(sorted)
    }

    async fn create_activity(&self, activity: &NewActivity) -> Result<Activity, AppError> {
        let mut inner = self.lock_inner();
        let created = Activity {
            id: Uuid::new_v4(),
            user_id: activity.user_id,
            quote_id: activity.quote_id,
            client_id: activity.client_id,
            activity_type: activity.activity_type.clone(),
            description: activity.description.clone(),
            created_at: Utc::now(),
            user: None,
            quote: None,
            client: None,
        };
        inner.activities.push(created.clone());
        Ok(inner.joined_activity(&created))
    }
}
