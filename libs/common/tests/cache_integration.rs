//! Integration tests for the shared cache and clock
//!
//! These tests exercise the TTL slot the way the storefront services use it:
//! several handles to one slot, a manually driven clock and refreshes after
//! expiry.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use common::{ManualClock, TtlSlot};

#[tokio::test]
async fn test_clones_share_the_same_slot() -> anyhow::Result<()> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    let writer: TtlSlot<Vec<String>> = TtlSlot::new(Duration::hours(24), Arc::new(clock.clone()));
    let reader = writer.clone();

    writer.store(vec!["Sfax".to_string(), "Sousse".to_string()]).await;

    let cached = reader.get_fresh().await.expect("value should be cached");
    assert_eq!(cached.len(), 2);
    assert_eq!(reader.age().await, Some(Duration::zero()));

    Ok(())
}

#[tokio::test]
async fn test_refresh_after_expiry_restarts_ttl() -> anyhow::Result<()> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap());
    let slot = TtlSlot::new(Duration::hours(24), Arc::new(clock.clone()));

    slot.store(1_u32).await;
    clock.advance(Duration::hours(25));
    assert!(slot.get_fresh().await.is_none(), "stale value must not be served");

    slot.store(2_u32).await;
    clock.advance(Duration::hours(23));
    assert_eq!(slot.get_fresh().await.as_deref(), Some(&2));

    slot.invalidate().await;
    assert!(slot.get_fresh().await.is_none());

    Ok(())
}

#[test]
fn test_slot_usable_from_blocking_context() {
    let slot = TtlSlot::new(Duration::minutes(1), Arc::new(ManualClock::default()));

    tokio_test::block_on(async {
        slot.store("cached").await;
        assert_eq!(slot.get_fresh().await.as_deref(), Some(&"cached"));
    });
}
