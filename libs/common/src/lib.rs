//! Common library for the storefront backend
//!
//! This crate provides shared functionality used across the storefront
//! services: a clock abstraction, an in-process TTL cache slot and shared
//! configuration errors.

pub mod cache;
pub mod clock;
pub mod error;

pub use cache::TtlSlot;
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};

/// Example usage of the cache module
///
/// ```rust
/// use std::sync::Arc;
/// use chrono::Duration;
/// use common::{ManualClock, TtlSlot};
///
/// #[tokio::main]
/// async fn main() {
///     let clock = ManualClock::default();
///     let slot = TtlSlot::new(Duration::hours(24), Arc::new(clock.clone()));
///     slot.store(vec!["Tunis".to_string()]).await;
///     assert!(slot.get_fresh().await.is_some());
///
///     clock.advance(Duration::hours(24));
///     assert!(slot.get_fresh().await.is_none());
/// }
/// ```
pub fn example_usage() {}
