use std::time::Duration;

use coverdesk_core::AppError;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the hosted backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project URL, without the `/auth/v1` or `/rest/v1` suffix.
    pub url: Url,
    /// Public key sent as `apikey` on every request.
    pub anon_key: String,
    /// Privileged key for server-side data access.
    pub service_role_key: Option<String>,
    pub timeout: Duration,
}

impl BackendConfig {
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, AppError> {
        Ok(Self {
            url: parse_url(url)?,
            anon_key: anon_key.into(),
            service_role_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_service_role_key(mut self, key: impl Into<String>) -> Self {
        self.service_role_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read configuration from environment variables.
    ///
    /// - `SUPABASE_URL` (required)
    /// - `SUPABASE_ANON_KEY` (required)
    /// - `SUPABASE_SERVICE_ROLE_KEY` (optional)
    /// - `SUPABASE_TIMEOUT_SECS` (optional, defaults to 30)
    pub fn from_env() -> Result<Self, AppError> {
        let url = std::env::var("SUPABASE_URL").map_err(|_| {
            AppError::ConfigError("SUPABASE_URL not set. Required for the hosted backend.".into())
        })?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| {
            AppError::ConfigError(
                "SUPABASE_ANON_KEY not set. Required for the hosted backend.".into(),
            )
        })?;

        let timeout_secs = match std::env::var("SUPABASE_TIMEOUT_SECS") {
            Err(_) => DEFAULT_TIMEOUT_SECS,
            Ok(raw) => {
                let parsed: u64 = raw.parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid SUPABASE_TIMEOUT_SECS '{raw}': must be a positive integer"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "SUPABASE_TIMEOUT_SECS must be at least 1".into(),
                    ));
                }
                parsed
            }
        };

        let mut config =
            Self::new(&url, anon_key)?.with_timeout(Duration::from_secs(timeout_secs));
        if let Ok(key) = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            && !key.trim().is_empty()
        {
            config = config.with_service_role_key(key);
        }
        Ok(config)
    }

    /// Base URL of the auth API.
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base())
    }

    /// Base URL of the data API.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base())
    }

    /// Key used for data access: the service key when configured.
    pub fn data_key(&self) -> &str {
        self.service_role_key.as_deref().unwrap_or(&self.anon_key)
    }

    fn base(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

fn parse_url(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| AppError::ConfigError(format!("Invalid backend URL '{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::ConfigError(format!(
            "Invalid backend URL '{raw}': scheme must be http or https"
        )));
    }
    Ok(url)
}
