//! Request middleware: admin route guard and per-client rate limiting

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use std::net::SocketAddr;
use tracing::debug;

use crate::{
    error::ApiError,
    rate_limiter::{LimitPolicy, UNKNOWN_CLIENT},
    state::AppState,
};

/// Where unauthenticated admin page requests are sent
pub const LOGIN_PAGE: &str = "/admin/login";

static RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Require a valid admin session
///
/// Page requests without one are redirected to the login page; API requests
/// get a 401.
pub async fn admin_guard(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let jar = CookieJar::from_headers(req.headers());
    let verdict = state.session.verify(&jar);

    if verdict.is_authenticated() {
        return next.run(req).await;
    }

    debug!("Admin guard denied {}: {:?}", req.uri().path(), verdict);

    if req.uri().path().starts_with("/api/") {
        ApiError::Unauthorized.into_response()
    } else {
        Redirect::to(LOGIN_PAGE).into_response()
    }
}

/// Limit chat requests per client IP
pub async fn chat_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let policy = state.chat_limit;
    enforce(&state, "chat", policy, req, next).await
}

/// Limit admin login attempts per client IP
pub async fn login_rate_limit(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let policy = state.login_limit;
    enforce(&state, "login", policy, req, next).await
}

async fn enforce(
    state: &AppState,
    scope: &str,
    policy: LimitPolicy,
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let key = format!("{}:{}", scope, client_ip(&req, state.trust_proxy_headers));
    let decision = state
        .rate_limiter
        .check(&key, policy.max_requests, policy.window)
        .await;

    if !decision.allowed {
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs(),
        });
    }

    let mut response = next.run(req).await;
    response.headers_mut().insert(
        RATE_LIMIT_REMAINING.clone(),
        HeaderValue::from(decision.remaining),
    );
    Ok(response)
}

/// Client IP used as the rate-limit key
///
/// Proxy headers are client-controlled unless a reverse proxy rewrites them,
/// so they are only read when `trust_proxy_headers` is set. Otherwise the
/// socket peer is used. Callers that cannot be identified share the
/// [`UNKNOWN_CLIENT`] bucket.
pub fn client_ip<B>(req: &Request<B>, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(ip) = proxied_ip(req) {
            return ip;
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn proxied_ip<B>(req: &Request<B>) -> Option<String> {
    let headers = req.headers();

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/api/chat");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let req = request(&[
            ("x-forwarded-for", "203.0.113.7, 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&req, true), "203.0.113.7");
    }

    #[test]
    fn test_client_ip_uses_real_ip() {
        let req = request(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&req, true), "198.51.100.2");
    }

    #[test]
    fn test_client_ip_uses_peer_address() {
        let mut req = request(&[]);
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 54321))));
        assert_eq!(client_ip(&req, true), "192.0.2.10");
    }

    #[test]
    fn test_proxy_headers_ignored_unless_trusted() {
        let mut req = request(&[
            ("x-forwarded-for", "203.0.113.7"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&req, false), UNKNOWN_CLIENT);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 10], 54321))));
        assert_eq!(client_ip(&req, false), "192.0.2.10");
    }

    #[test]
    fn test_unidentified_clients_share_a_bucket() {
        assert_eq!(client_ip(&request(&[]), true), UNKNOWN_CLIENT);
        assert_eq!(
            client_ip(&request(&[("x-forwarded-for", " ")]), true),
            UNKNOWN_CLIENT
        );
    }
}
