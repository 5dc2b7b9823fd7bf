//! CRM records behind the admin area: quotes pipeline, clients, user
//! directory, and the activity log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::models::{InsuranceType, PipelineStage};

/// Number of entries returned by the activity feed when no limit is given.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 50;
pub const MAX_ACTIVITY_LIMIT: usize = 200;

/// Amounts are `numeric` columns; the data API may return them as JSON
/// numbers or as strings.
fn de_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!("Unknown priority: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Suspended => "suspended",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "suspended" => Ok(UserStatus::Suspended),
            _ => Err(format!("Unknown user status: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Quotes
// ---------------------------------------------------------------------------

/// A configurable pipeline column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuoteStatus {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    pub sort_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl QuoteStatus {
    /// The built-in stage this status maps to, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        self.name.parse().ok()
    }

    /// One status per built-in stage, in pipeline order.
    pub fn defaults() -> Vec<QuoteStatus> {
        PipelineStage::ALL
            .iter()
            .zip(1..)
            .map(|(stage, sort_order)| QuoteStatus {
                id: Uuid::new_v4(),
                name: stage.as_str().to_string(),
                display_name: stage.display_name().to_string(),
                sort_order,
                is_active: true,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClientRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ClientRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match on first name, last name, or email.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [
            Some(self.first_name.as_str()),
            Some(self.last_name.as_str()),
            self.email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Quote {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    pub status_id: Option<Uuid>,
    #[serde(default)]
    pub insurance_type: Option<InsuranceType>,
    #[serde(default, deserialize_with = "de_amount")]
    pub coverage_amount: Option<f64>,
    #[serde(default, deserialize_with = "de_amount")]
    pub premium_amount: Option<f64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<QuoteStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientRecord>,
}

impl Quote {
    pub fn stage(&self) -> Option<PipelineStage> {
        self.status.as_ref().and_then(QuoteStatus::stage)
    }
}

/// Partial update of a quote. Only `Some` fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct QuoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_type: Option<InsuranceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl QuoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.status_id.is_none()
            && self.assigned_to.is_none()
            && self.insurance_type.is_none()
            && self.coverage_amount.is_none()
            && self.premium_amount.is_none()
            && self.priority.is_none()
    }

    pub fn apply_to(&self, quote: &mut Quote) {
        if let Some(title) = &self.title {
            quote.title = title.clone();
        }
        if let Some(status_id) = self.status_id {
            quote.status_id = Some(status_id);
        }
        if let Some(assigned_to) = self.assigned_to {
            quote.assigned_to = Some(assigned_to);
        }
        if let Some(ty) = self.insurance_type {
            quote.insurance_type = Some(ty);
        }
        if let Some(amount) = self.coverage_amount {
            quote.coverage_amount = Some(amount);
        }
        if let Some(amount) = self.premium_amount {
            quote.premium_amount = Some(amount);
        }
        if let Some(priority) = self.priority {
            quote.priority = Some(priority);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuoteFilter {
    pub status_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub insurance_type: Option<InsuranceType>,
}

impl QuoteFilter {
    pub fn matches(&self, quote: &Quote) -> bool {
        self.status_id.is_none_or(|id| quote.status_id == Some(id))
            && self.assigned_to.is_none_or(|id| quote.assigned_to == Some(id))
            && self
                .insurance_type
                .is_none_or(|ty| quote.insurance_type == Some(ty))
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Entry in the CRM user directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CrmUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vendor_company_name: Option<String>,
    #[serde(default)]
    pub vendor_type: Option<String>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewCrmUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_type: Option<String>,
    pub status: UserStatus,
    pub timezone: String,
    pub preferred_language: String,
}

impl NewCrmUser {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            full_name: full_name.into(),
            role,
            department: None,
            job_title: None,
            employee_id: None,
            phone: None,
            vendor_company_name: None,
            vendor_type: None,
            status: UserStatus::Active,
            timezone: "America/New_York".to_string(),
            preferred_language: "en".to_string(),
        }
    }

    /// Vendor fields only apply to vendors, employee fields only to staff.
    pub fn normalized(mut self) -> Self {
        if self.role != Role::Vendor {
            self.vendor_company_name = None;
            self.vendor_type = None;
        }
        if !matches!(self.role, Role::Employee | Role::Admin) {
            self.department = None;
            self.job_title = None;
            self.employee_id = None;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_language: Option<String>,
}

impl UserUpdate {
    pub fn apply_to(&self, user: &mut CrmUser) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(name) = &self.full_name {
            user.full_name = name.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(department) = &self.department {
            user.department = Some(department.clone());
        }
        if let Some(job_title) = &self.job_title {
            user.job_title = Some(job_title.clone());
        }
        if let Some(phone) = &self.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        if let Some(tz) = &self.timezone {
            user.timezone = Some(tz.clone());
        }
        if let Some(lang) = &self.preferred_language {
            user.preferred_language = Some(lang.clone());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserFilter {
    pub fn matches(&self, user: &CrmUser) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                user.full_name.to_lowercase().contains(&term)
                    || user.email.to_lowercase().contains(&term)
                    || user
                        .employee_id
                        .as_deref()
                        .is_some_and(|id| id.to_lowercase().contains(&term))
            }
        };

        matches_search
            && self.role.is_none_or(|role| user.role == role)
            && self.status.is_none_or(|status| user.status == status)
    }
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityActor {
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityQuoteRef {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActivityClientRef {
    pub first_name: String,
    pub last_name: String,
}

/// Entry in the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Activity {
    pub id: Uuid,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub quote_id: Option<Uuid>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    pub activity_type: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ActivityActor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<ActivityQuoteRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ActivityClientRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct NewActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Uuid>,
    pub activity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub quote_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub limit: Option<usize>,
}

impl ActivityFilter {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
            .clamp(1, MAX_ACTIVITY_LIMIT)
    }

    pub fn matches(&self, activity: &Activity) -> bool {
        self.quote_id.is_none_or(|id| activity.quote_id == Some(id))
            && self.client_id.is_none_or(|id| activity.client_id == Some(id))
    }
}
