use std::time::Duration;

use coverdesk_core::AppError;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_ADMIN_CACHE_TTL_SECS: u64 = 60;

/// Where submissions and CRM data are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// The hosted backend's data API.
    Remote,
    /// Process memory; lost on restart.
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "remote" => Ok(StoreKind::Remote),
            "memory" => Ok(StoreKind::Memory),
            other => Err(AppError::ConfigError(format!(
                "Invalid COVERDESK_STORE '{other}': expected 'remote' or 'memory'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub store: StoreKind,
    /// How long a verified admin token is trusted without asking the
    /// backend again. Zero disables caching.
    pub admin_cache_ttl: Duration,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `COVERDESK_PORT` (optional, falls back to `PORT`, then 3000)
    /// - `COVERDESK_STORE` (optional, `remote` when `SUPABASE_URL` is set,
    ///   otherwise `memory`)
    /// - `COVERDESK_ADMIN_CACHE_TTL_SECS` (optional, defaults to 60)
    pub fn from_env() -> Result<Self, AppError> {
        let port = match std::env::var("COVERDESK_PORT").or_else(|_| std::env::var("PORT")) {
            Err(_) => DEFAULT_PORT,
            Ok(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid port '{raw}': must be 0-65535"))
            })?,
        };

        let store = match std::env::var("COVERDESK_STORE") {
            Ok(raw) => raw.parse()?,
            Err(_) if std::env::var("SUPABASE_URL").is_ok() => StoreKind::Remote,
            Err(_) => StoreKind::Memory,
        };

        let ttl_secs = match std::env::var("COVERDESK_ADMIN_CACHE_TTL_SECS") {
            Err(_) => DEFAULT_ADMIN_CACHE_TTL_SECS,
            Ok(raw) => raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid COVERDESK_ADMIN_CACHE_TTL_SECS '{raw}': must be a non-negative integer"
                ))
            })?,
        };

        Ok(Self {
            port,
            store,
            admin_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}
