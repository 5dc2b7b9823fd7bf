//! HTTP clients: the hosted backend's auth and data APIs, and the Coverdesk
//! REST API used by the admin CLI.

pub mod api;
pub mod auth;
pub mod config;
mod http;
pub mod rest;
pub mod supabase;

pub use api::ApiClient;
pub use auth::GoTrueClient;
pub use config::BackendConfig;
pub use rest::PostgrestClient;
pub use supabase::SupabaseClient;
