use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use coverdesk_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self.0 {
            AppError::ValidationError { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::AuthError(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BackendError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "backend_error"),
            AppError::NetworkError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "network_error"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }

        let fields = match self.0 {
            AppError::ValidationError { ref fields, .. } => Some(fields.clone()),
            _ => None,
        };
        let message = match &self.0 {
            AppError::ValidationError { message, .. }
            | AppError::BackendError { message, .. } => message.clone(),
            AppError::AuthError(msg) | AppError::Forbidden(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = ErrorResponse {
            success: false,
            error: error_type.to_string(),
            message,
            fields,
        };

        (status, axum::Json(body)).into_response()
    }
}

/// JSON body extractor whose parse failures use the API's error envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError(AppError::from(e)).into_response())
    }
}

/// `{id}` path segment parsed as a UUID. A malformed id is a validation
/// error on `id`.
pub struct PathId(pub Uuid);

impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map(|Path(id)| PathId(id))
            .map_err(|_| ApiError(AppError::invalid_field("id", "Invalid id: expected a UUID")))
    }
}

/// Query-string extractor whose parse failures use the API's error envelope.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(query)| QueryParams(query))
            .map_err(|rejection| {
                ApiError(AppError::ValidationError {
                    message: rejection.body_text(),
                    fields: Vec::new(),
                })
            })
    }
}
