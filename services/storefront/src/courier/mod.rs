//! Courier partner integration
//!
//! The courier exposes a flat listing of delivery locations
//! (`{gouvernorat, ville}` pairs) and a shipment-creation call. The listing
//! feeds the [`RegionCache`], which backs checkout dropdowns and address
//! validation.

pub mod client;
pub mod regions;

pub use client::{
    CourierClient, CourierError, Recipient, ShipmentOutcome, ShipmentRequest, VilleRecord,
    VilleSource,
};
pub use regions::{GOUVERNORATS, RegionCache, RegionLookup, RegionMap, RegionOrigin};
