//! Auth-backend types: users, sessions, and auth-state change events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const ADMIN_ACCESS_DENIED: &str =
    "Access denied. You do not have admin privileges to access this area.";

/// Role claim carried in a user's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Employee,
    Client,
    Vendor,
    System,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Employee,
        Role::Client,
        Role::Vendor,
        Role::System,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Client => "client",
            Role::Vendor => "vendor",
            Role::System => "system",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Role::Admin => "Full system access with all permissions",
            Role::Employee => "Internal staff with CRM and workflow access",
            Role::Client => "Policyholders with self-service access",
            Role::Vendor => "MGA/Carrier partners with limited access",
            Role::System => "Automated system processes",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "employee" => Ok(Role::Employee),
            "client" => Ok(Role::Client),
            "vendor" => Ok(Role::Vendor),
            "system" => Ok(Role::System),
            _ => Err(format!("Unknown role: {s}")),
        }
    }
}

/// A user as reported by the auth backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}

impl AuthUser {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: Some(email.into()),
            user_metadata: serde_json::Map::new(),
            app_metadata: serde_json::Map::new(),
        }
    }

    /// Sets the role claim in `app_metadata`.
    pub fn with_role(mut self, role: Role) -> Self {
        self.app_metadata
            .insert("role".to_string(), serde_json::Value::from(role.as_str()));
        self
    }

    /// Role claim, read from `app_metadata` first and then `user_metadata`.
    ///
    /// `app_metadata` can only be written with the service key, so it wins
    /// when both carry a role.
    pub fn role(&self) -> Option<Role> {
        [&self.app_metadata, &self.user_metadata]
            .into_iter()
            .filter_map(|meta| meta.get("role").and_then(|v| v.as_str()))
            .find_map(|raw| raw.parse().ok())
    }

    /// True if either metadata map carries `role = admin`.
    pub fn is_admin(&self) -> bool {
        [&self.app_metadata, &self.user_metadata]
            .into_iter()
            .any(|meta| meta.get("role").and_then(|v| v.as_str()) == Some("admin"))
    }
}

/// An authenticated session issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Unix timestamp at which the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Fills in `expires_at` from `expires_in` when the backend omitted it.
    pub fn anchored_at(mut self, issued_at: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(issued_at.timestamp() + self.expires_in);
        }
        self
    }

    /// True once the access token is within `margin_secs` of expiring.
    pub fn is_expired(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now.timestamp() + margin_secs >= expires_at,
            None => false,
        }
    }
}

/// Kind of auth-state change reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChange {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl fmt::Display for AuthChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthChange::InitialSession => "INITIAL_SESSION",
            AuthChange::SignedIn => "SIGNED_IN",
            AuthChange::SignedOut => "SIGNED_OUT",
            AuthChange::TokenRefreshed => "TOKEN_REFRESHED",
            AuthChange::UserUpdated => "USER_UPDATED",
        };
        write!(f, "{name}")
    }
}

/// Notification delivered to auth-state subscribers.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    pub change: AuthChange,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn signed_in(session: Session) -> Self {
        Self {
            change: AuthChange::SignedIn,
            session: Some(session),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            change: AuthChange::SignedOut,
            session: None,
        }
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.session.as_ref().map(|s| &s.user)
    }
}

/// User-facing message for a failed sign-in attempt.
///
/// Backend messages are not shown verbatim so that the login screen does not
/// reveal whether an account exists.
pub fn login_failure_message(error: &AppError) -> &'static str {
    let message = match error {
        AppError::AuthError(msg) => msg.as_str(),
        AppError::BackendError { message, .. } => message.as_str(),
        _ => "",
    };

    if message.contains("Invalid login credentials") {
        "Invalid email or password. Please try again."
    } else if message.contains("Email not confirmed") {
        "Please confirm your email address before logging in."
    } else {
        "Login failed. Please check your credentials and try again."
    }
}
