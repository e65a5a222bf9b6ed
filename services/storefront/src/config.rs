//! Storefront configuration
//!
//! Configuration is layered with the `config` crate: built-in defaults, an
//! optional `config/storefront.{toml,yaml,json}` file, then environment
//! variables prefixed with `STOREFRONT` and split on `__`
//! (e.g. `STOREFRONT__ADMIN__PASSWORD`).

use common::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::fmt;
use tracing::warn;

/// Environment variable holding the CMS write token, reused as a signing secret
pub const CMS_WRITE_TOKEN_VAR: &str = "SANITY_API_WRITE_TOKEN";

/// Signing secret used when nothing else is configured (development only)
pub const DEV_FALLBACK_SECRET: &str = "storefront-dev-only-insecure-session-secret";

const MIN_SECRET_LEN: usize = 32;

const DAY_SECS: u64 = 24 * 60 * 60;
/// Longest accepted admin session
pub const MAX_SESSION_TTL_SECS: u64 = 365 * DAY_SECS;
/// Longest accepted rate-limit window
pub const MAX_WINDOW_SECS: u64 = DAY_SECS;
/// Longest accepted region cache lifetime
pub const MAX_REGION_TTL_SECS: u64 = 30 * DAY_SECS;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    /// Take the client IP from `x-forwarded-for`/`x-real-ip`; only enable
    /// behind a reverse proxy that overwrites these headers
    pub trust_proxy_headers: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            trust_proxy_headers: false,
        }
    }
}

/// Admin credentials and session settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Admin login name (default: "admin")
    pub username: String,
    /// Plaintext admin password, hashed once at startup
    pub password: Option<String>,
    /// Pre-hashed admin password (Argon2 PHC string), preferred over `password`
    pub password_hash: Option<String>,
    /// Dedicated session signing secret
    pub session_secret: Option<String>,
    /// Session lifetime in seconds (default: 7 days)
    pub session_ttl_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: None,
            password_hash: None,
            session_secret: None,
            session_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .field("session_secret", &self.session_secret.as_ref().map(|_| "<redacted>"))
            .field("session_ttl_secs", &self.session_ttl_secs)
            .finish()
    }
}

/// Request quotas for abuse-prone endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Chat requests allowed per window (default: 10)
    pub chat_max_requests: u32,
    /// Chat window in milliseconds (default: 60 000)
    pub chat_window_ms: u64,
    /// Admin login attempts allowed per window (default: 5)
    pub login_max_attempts: u32,
    /// Admin login window in seconds (default: 15 minutes)
    pub login_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            chat_max_requests: 10,
            chat_window_ms: 60_000,
            login_max_attempts: 5,
            login_window_secs: 900,
        }
    }
}

/// Courier partner API settings
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    /// Per-request timeout in seconds (default: 10)
    pub timeout_secs: u64,
    /// Lifetime of the cached region map in seconds (default: 24 hours)
    pub region_ttl_secs: u64,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081/api/v1".to_string(),
            api_token: None,
            timeout_secs: 10,
            region_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl fmt::Debug for CourierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CourierConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("region_ttl_secs", &self.region_ttl_secs)
            .finish()
    }
}

/// Shopping assistant upstream
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// URL the chat endpoint forwards to; chat is disabled when unset
    pub upstream_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Full application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub admin: AdminConfig,
    pub rate_limit: RateLimitConfig,
    pub courier: CourierConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> ConfigResult<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/storefront").required(false))
            .add_source(
                config::Environment::with_prefix("STOREFRONT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .map_err(|e| ConfigError::Source(e.to_string()))?;

        Self::from_config(settings)
    }

    /// Deserialize and validate an already-built configuration
    pub fn from_config(settings: config::Config) -> ConfigResult<Self> {
        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Source(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.admin.session_ttl_secs == 0 {
            return Err(invalid("admin.session_ttl_secs", "must be greater than zero"));
        }
        if self.admin.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(invalid("admin.session_ttl_secs", "must be at most one year"));
        }
        if self.rate_limit.chat_max_requests == 0 || self.rate_limit.chat_window_ms == 0 {
            return Err(invalid("rate_limit.chat_*", "limit and window must be non-zero"));
        }
        if self.rate_limit.chat_window_ms > MAX_WINDOW_SECS * 1000 {
            return Err(invalid("rate_limit.chat_window_ms", "must be at most one day"));
        }
        if self.rate_limit.login_max_attempts == 0 || self.rate_limit.login_window_secs == 0 {
            return Err(invalid("rate_limit.login_*", "limit and window must be non-zero"));
        }
        if self.rate_limit.login_window_secs > MAX_WINDOW_SECS {
            return Err(invalid("rate_limit.login_window_secs", "must be at most one day"));
        }
        if self.courier.region_ttl_secs > MAX_REGION_TTL_SECS {
            return Err(invalid("courier.region_ttl_secs", "must be at most 30 days"));
        }
        if !(self.courier.base_url.starts_with("http://")
            || self.courier.base_url.starts_with("https://"))
        {
            return Err(invalid("courier.base_url", "must be an http(s) URL"));
        }
        Ok(())
    }

    /// Resolve the session signing secret for this configuration
    ///
    /// Reads the CMS write token from the process environment as the second tier.
    pub fn session_secret(&self) -> ConfigResult<SigningSecret> {
        let write_token = std::env::var(CMS_WRITE_TOKEN_VAR).ok();
        resolve_session_secret(
            self.admin.session_secret.as_deref(),
            write_token.as_deref(),
            self.server.environment,
        )
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Dedicated,
    CmsWriteToken,
    DevelopmentFallback,
}

/// HMAC key for session tokens
#[derive(Clone)]
pub struct SigningSecret {
    value: String,
    source: SecretSource,
}

impl SigningSecret {
    pub fn new(value: impl Into<String>, source: SecretSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }

    pub fn source(&self) -> SecretSource {
        self.source
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningSecret")
            .field("value", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Pick the signing secret: dedicated secret, then the CMS write token, then
/// the development fallback. Production refuses the fallback.
pub fn resolve_session_secret(
    dedicated: Option<&str>,
    write_token: Option<&str>,
    environment: Environment,
) -> ConfigResult<SigningSecret> {
    let secret = if let Some(secret) = non_empty(dedicated) {
        SigningSecret::new(secret, SecretSource::Dedicated)
    } else if let Some(token) = non_empty(write_token) {
        SigningSecret::new(token, SecretSource::CmsWriteToken)
    } else if environment.is_production() {
        return Err(ConfigError::MissingSecret(
            "admin.session_secret must be set in production".to_string(),
        ));
    } else {
        warn!("No session secret configured, using the development fallback");
        return Ok(SigningSecret::new(
            DEV_FALLBACK_SECRET,
            SecretSource::DevelopmentFallback,
        ));
    };

    if secret.as_bytes().len() < MIN_SECRET_LEN {
        warn!(
            "Session secret from {:?} is shorter than {} bytes",
            secret.source(),
            MIN_SECRET_LEN
        );
    }

    Ok(secret)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
