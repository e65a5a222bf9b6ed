//! In-process TTL cache
//!
//! This module provides a single-value cache slot with a fixed time-to-live.
//! It is meant for process-wide lookups that are expensive to fetch and
//! change rarely (for example a courier's address taxonomy). State is per
//! process; nothing is shared across instances.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::SharedClock;

/// A cached value together with the time it was stored
#[derive(Debug, Clone)]
struct Stamped<T> {
    value: Arc<T>,
    stored_at: DateTime<Utc>,
}

/// Single-value cache with a fixed TTL
///
/// Cloning yields another handle to the same slot.
#[derive(Debug)]
pub struct TtlSlot<T> {
    ttl: Duration,
    clock: SharedClock,
    slot: Arc<RwLock<Option<Stamped<T>>>>,
}

impl<T> Clone for TtlSlot<T> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            clock: self.clock.clone(),
            slot: self.slot.clone(),
        }
    }
}

impl<T> TtlSlot<T> {
    /// Create an empty slot
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            ttl,
            clock,
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Return the cached value if it is younger than the TTL
    pub async fn get_fresh(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().await;
        let stamped = slot.as_ref()?;
        let age = self.clock.now() - stamped.stored_at;

        if age < self.ttl {
            Some(stamped.value.clone())
        } else {
            debug!("Cached value expired ({}s old)", age.num_seconds());
            None
        }
    }

    /// Store a value, stamping it with the current time
    pub async fn store(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let mut slot = self.slot.write().await;
        *slot = Some(Stamped {
            value: value.clone(),
            stored_at: self.clock.now(),
        });
        value
    }

    /// Drop the cached value
    pub async fn invalidate(&self) {
        self.slot.write().await.take();
    }

    /// Age of the cached value, if any
    pub async fn age(&self) -> Option<Duration> {
        let slot = self.slot.read().await;
        slot.as_ref().map(|stamped| self.clock.now() - stamped.stored_at)
    }
}
