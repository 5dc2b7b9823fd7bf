use thiserror::Error;

use crate::validation::FieldError;

/// Application-wide error types for Coverdesk.
#[derive(Error, Debug)]
pub enum AppError {
    /// One or more submitted fields failed validation.
    #[error("{message}")]
    ValidationError {
        message: String,
        fields: Vec<FieldError>,
    },

    /// Credentials or access token were rejected by the auth backend.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// The caller is authenticated but lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The hosted backend answered with an error status.
    #[error("Backend error (HTTP {status_code}): {message}")]
    BackendError { message: String, status_code: u16 },

    /// HTTP request could not be built or its response could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Build a validation error for a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::ValidationError {
            message: message.clone(),
            fields: vec![FieldError {
                field: field.into(),
                message,
            }],
        }
    }

    /// Returns true if the error was caused by the caller's input rather than
    /// by the backend or the network.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError { .. }
                | AppError::SerializationError(_)
                | AppError::AuthError(_)
                | AppError::Forbidden(_)
                | AppError::NotFound(_)
        )
    }
}
