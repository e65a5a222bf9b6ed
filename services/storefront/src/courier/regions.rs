//! Gouvernorat → villes taxonomy with a TTL cache and a static fallback
//!
//! The map is fetched from the courier at most once per TTL. When the fetch
//! fails the caller still gets a usable map: every known gouvernorat maps to
//! a single ville named after itself. The fallback is served but not cached,
//! so the next call tries the courier again.
//!
//! Concurrent callers that all miss the cache each fetch; there is no
//! request coalescing.

use chrono::Duration;
use common::{SharedClock, TtlSlot};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::client::{VilleRecord, VilleSource};

/// Gouvernorat name → sorted, de-duplicated ville names
pub type RegionMap = BTreeMap<String, Vec<String>>;

/// Top-level delivery regions known without asking the courier
pub const GOUVERNORATS: [&str; 24] = [
    "Ariana",
    "Beja",
    "Ben Arous",
    "Bizerte",
    "Gabes",
    "Gafsa",
    "Jendouba",
    "Kairouan",
    "Kasserine",
    "Kebili",
    "Le Kef",
    "Mahdia",
    "Manouba",
    "Medenine",
    "Monastir",
    "Nabeul",
    "Sfax",
    "Sidi Bouzid",
    "Siliana",
    "Sousse",
    "Tataouine",
    "Tozeur",
    "Tunis",
    "Zaghouan",
];

/// Where a region map came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionOrigin {
    /// Served from the cache without a network call
    Cached,
    /// Freshly fetched from the courier
    Fetched,
    /// Courier unavailable; self-mapped static regions
    Fallback,
}

/// A region map together with its origin
#[derive(Debug, Clone)]
pub struct RegionLookup {
    pub regions: Arc<RegionMap>,
    pub origin: RegionOrigin,
}

/// Process-wide region taxonomy cache
#[derive(Clone)]
pub struct RegionCache {
    source: Arc<dyn VilleSource>,
    slot: TtlSlot<RegionMap>,
}

impl RegionCache {
    /// Create a new cache over `source` with the given TTL
    pub fn new(source: Arc<dyn VilleSource>, ttl: Duration, clock: SharedClock) -> Self {
        Self {
            source,
            slot: TtlSlot::new(ttl, clock),
        }
    }

    /// Return the region map, fetching it when the cache is empty or stale
    pub async fn resolve(&self) -> RegionLookup {
        if let Some(regions) = self.slot.get_fresh().await {
            return RegionLookup {
                regions,
                origin: RegionOrigin::Cached,
            };
        }

        match self.source.list_villes().await {
            Ok(records) => {
                let regions = self.slot.store(fold_records(records)).await;
                info!("Region map refreshed with {} gouvernorats", regions.len());
                RegionLookup {
                    regions,
                    origin: RegionOrigin::Fetched,
                }
            }
            Err(e) => {
                warn!("Courier location listing unavailable, using fallback: {}", e);
                RegionLookup {
                    regions: Arc::new(fallback_map()),
                    origin: RegionOrigin::Fallback,
                }
            }
        }
    }

    /// Region map without its origin
    pub async fn region_map(&self) -> Arc<RegionMap> {
        self.resolve().await.regions
    }

    /// Villes of one gouvernorat; never empty
    pub async fn villes_for(&self, gouvernorat: &str) -> Vec<String> {
        let regions = self.region_map().await;
        regions
            .get(gouvernorat)
            .filter(|villes| !villes.is_empty())
            .cloned()
            .unwrap_or_else(|| vec![gouvernorat.to_string()])
    }
}

/// Every static gouvernorat mapped to itself
pub fn fallback_map() -> RegionMap {
    GOUVERNORATS
        .iter()
        .map(|name| (name.to_string(), vec![name.to_string()]))
        .collect()
}

/// Fold flat `(gouvernorat, ville)` pairs into a map and top it up with any
/// static gouvernorat the courier did not list
fn fold_records(records: Vec<VilleRecord>) -> RegionMap {
    let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for record in records {
        let gouvernorat = record.gouvernorat.trim();
        let ville = record.ville.trim();
        if gouvernorat.is_empty() || ville.is_empty() {
            continue;
        }
        grouped
            .entry(gouvernorat.to_string())
            .or_default()
            .insert(ville.to_string());
    }

    for name in GOUVERNORATS {
        grouped
            .entry(name.to_string())
            .or_insert_with(|| BTreeSet::from([name.to_string()]));
    }

    grouped
        .into_iter()
        .map(|(gouvernorat, villes)| (gouvernorat, villes.into_iter().collect()))
        .collect()
}
