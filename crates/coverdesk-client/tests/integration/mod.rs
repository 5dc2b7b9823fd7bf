mod api_client_tests;
mod auth_tests;
mod common;
mod rest_tests;
