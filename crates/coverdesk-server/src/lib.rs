//! REST API server: public intake forms, admin routes, the admin gate, and
//! OpenAPI documentation.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
