use std::future::Future;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{AuthEvent, AuthUser, Session};
use crate::crm::{
    Activity, ActivityFilter, ClientRecord, CrmUser, NewActivity, NewCrmUser, Quote, QuoteFilter,
    QuoteStatus, QuoteUpdate, UserFilter, UserUpdate,
};
use crate::error::AppError;
use crate::models::{ClientSubmission, NewClientSubmission, NewQuoteRequest, QuoteRequest};

/// Session-holding side of the auth backend, as used by an interactive client.
pub trait AuthBackend: Send + Sync + Clone + 'static {
    /// Returns the current session, if any.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, AppError>> + Send;

    /// Checks credentials with the backend and stores the resulting session.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AppError>> + Send;

    /// Ends the current session. Subscribers are notified with a sign-out
    /// event before this resolves.
    fn sign_out(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Subscribes to auth-state change notifications. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Resolves a bearer access token to the user it was issued for.
pub trait IdentityLookup: Send + Sync + Clone {
    fn get_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<AuthUser, AppError>> + Send;
}

/// Persists and retrieves public form submissions.
pub trait SubmissionStore: Send + Sync + Clone {
    fn insert_client_submission(
        &self,
        submission: &NewClientSubmission,
    ) -> impl Future<Output = Result<ClientSubmission, AppError>> + Send;

    fn insert_quote_request(
        &self,
        request: &NewQuoteRequest,
    ) -> impl Future<Output = Result<QuoteRequest, AppError>> + Send;

    /// Client submissions, newest first.
    fn list_client_submissions(
        &self,
    ) -> impl Future<Output = Result<Vec<ClientSubmission>, AppError>> + Send;

    /// Quote requests, newest first.
    fn list_quote_requests(&self)
    -> impl Future<Output = Result<Vec<QuoteRequest>, AppError>> + Send;

    /// Returns false if no submission had this id.
    fn delete_client_submission(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Returns false if no quote request had this id.
    fn delete_quote_request(&self, id: Uuid) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Cheap round-trip used by the health endpoint.
    fn health_check(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// CRM data behind the admin area.
pub trait CrmStore: Send + Sync + Clone {
    /// Quotes with their status and client joined, newest first.
    fn list_quotes(
        &self,
        filter: &QuoteFilter,
    ) -> impl Future<Output = Result<Vec<Quote>, AppError>> + Send;

    fn get_quote(&self, id: Uuid) -> impl Future<Output = Result<Option<Quote>, AppError>> + Send;

    fn update_quote(
        &self,
        id: Uuid,
        update: &QuoteUpdate,
    ) -> impl Future<Output = Result<Option<Quote>, AppError>> + Send;

    /// Active statuses ordered by `sort_order`.
    fn list_quote_statuses(
        &self,
    ) -> impl Future<Output = Result<Vec<QuoteStatus>, AppError>> + Send;

    /// Clients newest first, optionally narrowed by a name/email search term.
    fn list_clients(
        &self,
        search: Option<&str>,
    ) -> impl Future<Output = Result<Vec<ClientRecord>, AppError>> + Send;

    /// Active users ordered by full name.
    fn list_users(
        &self,
        filter: &UserFilter,
    ) -> impl Future<Output = Result<Vec<CrmUser>, AppError>> + Send;

    fn get_user(&self, id: Uuid) -> impl Future<Output = Result<Option<CrmUser>, AppError>> + Send;

    fn create_user(
        &self,
        user: &NewCrmUser,
    ) -> impl Future<Output = Result<CrmUser, AppError>> + Send;

    fn update_user(
        &self,
        id: Uuid,
        update: &UserUpdate,
    ) -> impl Future<Output = Result<Option<CrmUser>, AppError>> + Send;

    fn delete_user(&self, id: Uuid) -> impl Future<Output = Result<bool, AppError>> + Send;

    /// Latest activity entries, newest first.
    fn list_activities(
        &self,
        filter: &ActivityFilter,
    ) -> impl Future<Output = Result<Vec<Activity>, AppError>> + Send;

    fn create_activity(
        &self,
        activity: &NewActivity,
    ) -> impl Future<Output = Result<Activity, AppError>> + Send;
}
