use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coverdesk API",
        version = "0.3.0",
        description = "Insurance lead intake forms and the admin CRM API."
    ),
    paths(
        crate::routes::root,
        crate::routes::health,
        crate::routes::submit_client_info,
        crate::routes::submit_quote_request,
        crate::routes::list_submissions,
        crate::routes::delete_client_submission,
        crate::routes::delete_quote_request,
        crate::routes::dashboard,
        crate::routes::list_quotes,
        crate::routes::get_quote,
        crate::routes::update_quote,
        crate::routes::list_quote_statuses,
        crate::routes::list_clients,
        crate::routes::list_users,
        crate::routes::create_user,
        crate::routes::get_user,
        crate::routes::update_user,
        crate::routes::delete_user,
        crate::routes::list_activities,
        crate::routes::create_activity,
    ),
    components(schemas(
        coverdesk_core::ClientInfoForm,
        coverdesk_core::QuoteRequestForm,
        coverdesk_core::UserForm,
        coverdesk_core::models::InsuranceType,
        coverdesk_core::models::PipelineStage,
        coverdesk_core::Role,
        coverdesk_core::crm::UserStatus,
        coverdesk_core::crm::Priority,
        coverdesk_core::validation::FieldError,
        crate::dto::ActivityForm,
        crate::dto::UserPage,
        crate::dto::HealthResponse,
        crate::dto::RootResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "forms", description = "Public intake forms"),
        (name = "submissions", description = "Submitted forms, admin only"),
        (name = "crm", description = "Quotes, pipeline and clients"),
        (name = "users", description = "User directory"),
        (name = "activities", description = "Activity log"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the Bearer token security scheme to the OpenAPI document.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token issued by the auth backend to a user with the admin role. \
                             Accepted tokens are cached for COVERDESK_ADMIN_CACHE_TTL_SECS \
                             (default 60), so a token signed out or expired within that window \
                             keeps admin access until the entry lapses. Set it to 0 to check \
                             every request against the auth backend.",
                        ))
                        .build(),
                ),
            );
        }
    }
}
