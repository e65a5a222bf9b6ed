//! Application state shared across handlers
//!
//! This is the composition root: the rate limiter and the region cache are
//! created once here and shared by every request through cheap clones.

use anyhow::{Context, Result};
use chrono::Duration;
use common::SharedClock;
use std::sync::Arc;
use tracing::info;

use crate::{
    chat::ChatProxy,
    config::AppConfig,
    courier::{CourierClient, RegionCache},
    jwt::SessionTokens,
    rate_limiter::{LimitPolicy, RateLimiter},
    session::{AdminCredentials, AdminSession},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub session: AdminSession,
    pub rate_limiter: RateLimiter,
    pub chat_limit: LimitPolicy,
    pub login_limit: LimitPolicy,
    pub trust_proxy_headers: bool,
    pub courier: CourierClient,
    pub regions: RegionCache,
    pub chat: ChatProxy,
}

impl AppState {
    /// Wire every service from configuration
    pub fn build(config: &AppConfig, clock: SharedClock) -> Result<Self> {
        let secret = config.session_secret()?;
        info!("Session tokens signed with secret from {:?}", secret.source());

        let tokens = SessionTokens::new(
            &secret,
            seconds(config.admin.session_ttl_secs, "admin.session_ttl_secs")?,
            clock.clone(),
        );
        let credentials = AdminCredentials::from_config(&config.admin)?;
        let session = AdminSession::new(
            credentials,
            tokens,
            config.server.environment.is_production(),
        );

        let limits = &config.rate_limit;
        let chat_limit = LimitPolicy {
            max_requests: limits.chat_max_requests,
            window: milliseconds(limits.chat_window_ms, "rate_limit.chat_window_ms")?,
        };
        let login_limit = LimitPolicy {
            max_requests: limits.login_max_attempts,
            window: seconds(limits.login_window_secs, "rate_limit.login_window_secs")?,
        };

        let courier = CourierClient::new(&config.courier)?;
        let regions = RegionCache::new(
            Arc::new(courier.clone()),
            seconds(config.courier.region_ttl_secs, "courier.region_ttl_secs")?,
            clock.clone(),
        );

        Ok(Self {
            session,
            rate_limiter: RateLimiter::with_clock(clock),
            chat_limit,
            login_limit,
            trust_proxy_headers: config.server.trust_proxy_headers,
            courier,
            regions,
            chat: ChatProxy::new(&config.chat)?,
        })
    }
}

fn seconds(value: u64, key: &str) -> Result<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .with_context(|| format!("{} is out of range: {}", key, value))
}

fn milliseconds(value: u64, key: &str) -> Result<Duration> {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_milliseconds)
        .with_context(|| format!("{} is out of range: {}", key, value))
}
