//! Storefront backend: admin sessions, request rate limiting and courier
//! address taxonomy behind an axum router.

pub mod chat;
pub mod config;
pub mod courier;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod rate_limiter;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;

pub use routes::create_router;
pub use state::AppState;
