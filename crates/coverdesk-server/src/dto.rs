use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coverdesk_core::Role;
use coverdesk_core::crm::{ActivityFilter, CrmUser, QuoteFilter, UserFilter, UserStatus};
use coverdesk_core::models::InsuranceType;
use coverdesk_core::pagination::{DEFAULT_PER_PAGE, Paged};
use coverdesk_core::validation::FieldError;

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            message: message.into(),
            fields: None,
        }
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub success: bool,
    /// `healthy` or `unhealthy`.
    pub status: String,
    /// `ok` or `error`.
    pub store: String,
}

// ---------------------------------------------------------------------------
// Quotes and clients
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct QuoteListQuery {
    pub status_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub insurance_type: Option<InsuranceType>,
}

impl From<QuoteListQuery> for QuoteFilter {
    fn from(query: QuoteListQuery) -> Self {
        Self {
            status_id: query.status_id,
            assigned_to: query.assigned_to,
            insurance_type: query.insurance_type,
        }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ClientSearchQuery {
    /// Matched against first name, last name and email.
    pub search: Option<String>,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl UserListQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            search: self.search.clone(),
            role: self.role,
            status: self.status,
        }
    }
}

/// One page of the user directory.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserPage {
    pub users: Vec<CrmUser>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl UserPage {
    pub fn new(users: Vec<CrmUser>, query: &UserListQuery) -> Self {
        let paged = Paged::new(
            users,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(DEFAULT_PER_PAGE),
        );
        Self {
            users: paged.items,
            page: paged.page,
            per_page: paged.per_page,
            total: paged.total,
            total_pages: paged.total_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ActivityQuery {
    pub quote_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    /// Defaults to 50.
    pub limit: Option<usize>,
}

impl From<ActivityQuery> for ActivityFilter {
    fn from(query: ActivityQuery) -> Self {
        Self {
            quote_id: query.quote_id,
            client_id: query.client_id,
            limit: query.limit,
        }
    }
}

/// Activity log entry as posted by an admin. The actor is taken from the
/// caller's token.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct ActivityForm {
    #[serde(alias = "quoteId")]
    pub quote_id: Option<Uuid>,
    #[serde(alias = "clientId")]
    pub client_id: Option<Uuid>,
    #[serde(alias = "activityType")]
    pub activity_type: String,
    pub description: Option<String>,
}
