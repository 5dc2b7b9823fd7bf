use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Extension, Router, middleware};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use coverdesk_core::crm::{
    Activity, ClientRecord, CrmUser, NewActivity, Quote, QuoteFilter, QuoteStatus, QuoteUpdate,
    UserUpdate,
};
use coverdesk_core::models::{ClientSubmission, QuoteRequest, Submissions};
use coverdesk_core::traits::{CrmStore, SubmissionStore};
use coverdesk_core::{AppError, AuthUser, ClientInfoForm, DashboardStats, QuoteRequestForm, UserForm};

use crate::auth::require_admin;
use crate::dto::{
    ActivityForm, ActivityQuery, ApiResponse, ClientSearchQuery, HealthResponse, QuoteListQuery,
    RootResponse, UserListQuery, UserPage,
};
use crate::error::{ApiError, JsonBody, PathId, QueryParams};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Request bodies larger than this are rejected with 413.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/submissions", get(list_submissions))
        .route("/api/client-submissions/{id}", delete(delete_client_submission))
        .route("/api/quote-requests/{id}", delete(delete_quote_request))
        .route("/api/admin/dashboard", get(dashboard))
        .route("/api/admin/quotes", get(list_quotes))
        .route("/api/admin/quotes/{id}", get(get_quote).patch(update_quote))
        .route("/api/admin/quote-statuses", get(list_quote_statuses))
        .route("/api/admin/clients", get(list_clients))
        .route("/api/admin/users", get(list_users).post(create_user))
        .route(
            "/api/admin/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route(
            "/api/admin/activities",
            get(list_activities).post(create_activity),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/client-info", post(submit_client_info))
        .route("/api/quote-request", post(submit_quote_request))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public
        .merge(api)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = RootResponse)),
    tag = "system"
)]
pub async fn root() -> impl IntoResponse {
    axum::Json(RootResponse {
        message: "Insurance Services API is running".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_ok = match state.store.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, store = state.store.kind(), "Health check failed");
            false
        }
    };

    let status = if store_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        success: store_ok,
        status: if store_ok { "healthy" } else { "unhealthy" }.to_string(),
        store: if store_ok { "ok" } else { "error" }.to_string(),
    };

    (status, axum::Json(body))
}

// ---------------------------------------------------------------------------
// Public forms
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/api/client-info",
    request_body = ClientInfoForm,
    responses(
        (status = 201, description = "Submission stored", body = ApiResponse<ClientSubmission>),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
    ),
    tag = "forms"
)]
pub async fn submit_client_info(
    State(state): State<Arc<AppState>>,
    JsonBody(form): JsonBody<ClientInfoForm>,
) -> Result<impl IntoResponse, ApiError> {
    let submission = form.into_new()?;
    let stored = state.store.insert_client_submission(&submission).await?;
    tracing::info!(id = %stored.id, "Client information submitted");

    Ok((
        StatusCode::CREATED,
        axum::Json(ApiResponse::with_message(
            "Client information submitted successfully",
            stored,
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/quote-request",
    request_body = QuoteRequestForm,
    responses(
        (status = 201, description = "Quote request stored", body = ApiResponse<QuoteRequest>),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
    ),
    tag = "forms"
)]
pub async fn submit_quote_request(
    State(state): State<Arc<AppState>>,
    JsonBody(form): JsonBody<QuoteRequestForm>,
) -> Result<impl IntoResponse, ApiError> {
    let request = form.into_new()?;
    let stored = state.store.insert_quote_request(&request).await?;
    tracing::info!(id = %stored.id, insurance_type = %stored.insurance_type, "Quote request submitted");

    Ok((
        StatusCode::CREATED,
        axum::Json(ApiResponse::with_message(
            "Quote request submitted successfully",
            stored,
        )),
    ))
}

// ---------------------------------------------------------------------------
// Submissions
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/submissions",
    responses(
        (status = 200, description = "Both submission collections, newest first", body = ApiResponse<Submissions>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Admin role required"),
    ),
    security(("bearer" = [])),
    tag = "submissions"
)]
pub async fn list_submissions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (client_submissions, quote_requests) = tokio::try_join!(
        state.store.list_client_submissions(),
        state.store.list_quote_requests(),
    )?;

    Ok(axum::Json(ApiResponse::ok(Submissions {
        client_submissions,
        quote_requests,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/client-submissions/{id}",
    params(("id" = Uuid, Path, description = "Client submission ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such submission", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "submissions"
)]
pub async fn delete_client_submission(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_client_submission(id).await? {
        return Err(AppError::NotFound(format!("client submission {id}")).into());
    }
    tracing::info!(%id, "Client submission deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/quote-requests/{id}",
    params(("id" = Uuid, Path, description = "Quote request ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "No such quote request", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "submissions"
)]
pub async fn delete_quote_request(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_quote_request(id).await? {
        return Err(AppError::NotFound(format!("quote request {id}")).into());
    }
    tracing::info!(%id, "Quote request deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Dashboard and quotes
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses((status = 200, description = "Pipeline statistics", body = ApiResponse<DashboardStats>)),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let filter = QuoteFilter::default();
    let (quotes, statuses) = tokio::try_join!(
        state.store.list_quotes(&filter),
        state.store.list_quote_statuses(),
    )?;

    Ok(axum::Json(ApiResponse::ok(DashboardStats::compute(
        &quotes, &statuses,
    ))))
}

#[utoipa::path(
    get,
    path = "/api/admin/quotes",
    params(QuoteListQuery),
    responses((status = 200, description = "Quotes, newest first", body = ApiResponse<Vec<Quote>>)),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn list_quotes(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<QuoteListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let quotes = state.store.list_quotes(&query.into()).await?;
    Ok(axum::Json(ApiResponse::ok(quotes)))
}

#[utoipa::path(
    get,
    path = "/api/admin/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote", body = ApiResponse<Quote>),
        (status = 404, description = "Quote not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn get_quote(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    let quote = state
        .store
        .get_quote(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("quote {id}")))?;
    Ok(axum::Json(ApiResponse::ok(quote)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote ID")),
    request_body = QuoteUpdate,
    responses(
        (status = 200, description = "Updated quote", body = ApiResponse<Quote>),
        (status = 404, description = "Quote not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn update_quote(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
    JsonBody(update): JsonBody<QuoteUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let quote = if update.is_empty() {
        state.store.get_quote(id).await?
    } else {
        state.store.update_quote(id, &update).await?
    };
    let quote = quote.ok_or_else(|| AppError::NotFound(format!("quote {id}")))?;

    tracing::info!(%id, "Quote updated");
    Ok(axum::Json(ApiResponse::with_message(
        "Quote updated successfully",
        quote,
    )))
}

#[utoipa::path(
    get,
    path = "/api/admin/quote-statuses",
    responses((status = 200, description = "Active statuses by sort order", body = ApiResponse<Vec<QuoteStatus>>)),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn list_quote_statuses(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let statuses = state.store.list_quote_statuses().await?;
    Ok(axum::Json(ApiResponse::ok(statuses)))
}

#[utoipa::path(
    get,
    path = "/api/admin/clients",
    params(ClientSearchQuery),
    responses((status = 200, description = "Clients, newest first", body = ApiResponse<Vec<ClientRecord>>)),
    security(("bearer" = [])),
    tag = "crm"
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ClientSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let clients = state.store.list_clients(query.search.as_deref()).await?;
    Ok(axum::Json(ApiResponse::ok(clients)))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses((status = 200, description = "Active users by name, paginated", body = ApiResponse<UserPage>)),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state.store.list_users(&query.filter()).await?;
    Ok(axum::Json(ApiResponse::ok(UserPage::new(users, &query))))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = UserForm,
    responses(
        (status = 201, description = "User created", body = ApiResponse<CrmUser>),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    JsonBody(form): JsonBody<UserForm>,
) -> Result<impl IntoResponse, ApiError> {
    let user = form.into_new()?;
    let created = state.store.create_user(&user).await?;
    tracing::info!(id = %created.id, role = %created.role, "User created");

    Ok((
        StatusCode::CREATED,
        axum::Json(ApiResponse::with_message("User created successfully", created)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = ApiResponse<CrmUser>),
        (status = 404, description = "User not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<impl IntoResponse, ApiError> {
    let user = CrmStore::get_user(&state.store, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;
    Ok(axum::Json(ApiResponse::ok(user)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<CrmUser>),
        (status = 404, description = "User not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
    JsonBody(update): JsonBody<UserUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::invalid_field("full_name", "Full name is required").into());
    }

    let user = state
        .store
        .update_user(id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))?;

    tracing::info!(%id, "User updated");
    Ok(axum::Json(ApiResponse::with_message(
        "User updated successfully",
        user,
    )))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "User not found", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    PathId(id): PathId,
) -> Result<StatusCode, ApiError> {
    if !state.store.delete_user(id).await? {
        return Err(AppError::NotFound(format!("user {id}")).into());
    }
    tracing::info!(%id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/admin/activities",
    params(ActivityQuery),
    responses((status = 200, description = "Latest activity, newest first", body = ApiResponse<Vec<Activity>>)),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<ActivityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let activities = state.store.list_activities(&query.into()).await?;
    Ok(axum::Json(ApiResponse::ok(activities)))
}

#[utoipa::path(
    post,
    path = "/api/admin/activities",
    request_body = ActivityForm,
    responses(
        (status = 201, description = "Activity logged", body = ApiResponse<Activity>),
        (status = 400, description = "Validation failed", body = crate::dto::ErrorResponse),
    ),
    security(("bearer" = [])),
    tag = "activities"
)]
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    JsonBody(form): JsonBody<ActivityForm>,
) -> Result<impl IntoResponse, ApiError> {
    let activity_type = form.activity_type.trim();
    if activity_type.is_empty() {
        return Err(AppError::invalid_field("activity_type", "Activity type is required").into());
    }

    let activity = NewActivity {
        user_id: Some(caller.id),
        quote_id: form.quote_id,
        client_id: form.client_id,
        activity_type: activity_type.to_string(),
        description: form
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };
    let created = state.store.create_activity(&activity).await?;

    Ok((
        StatusCode::CREATED,
        axum::Json(ApiResponse::with_message("Activity logged", created)),
    ))
}
