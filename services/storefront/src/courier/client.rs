//! HTTP client for the courier partner API

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::config::CourierConfig;

/// One delivery location as listed by the courier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VilleRecord {
    pub gouvernorat: String,
    pub ville: String,
}

/// Errors from the courier API
#[derive(Error, Debug)]
pub enum CourierError {
    #[error("Courier request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Courier responded with status {0}")]
    Status(StatusCode),

    #[error("Courier returned an empty location listing")]
    EmptyListing,

    #[error("Courier rejected the shipment: {0}")]
    Rejected(String),
}

/// Source of the flat location listing
#[async_trait]
pub trait VilleSource: Send + Sync {
    async fn list_villes(&self) -> Result<Vec<VilleRecord>, CourierError>;
}

/// Shipment recipient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub name: String,
    pub address: String,
    pub gouvernorat: String,
    pub ville: String,
    pub phone: String,
}

/// Shipment to hand over to the courier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRequest {
    /// Storefront order reference
    pub order_reference: String,
    pub recipient: Recipient,
    /// Number of items in the parcel
    pub item_count: u32,
    /// Declared value in TND, collected on delivery
    pub declared_value: f64,
}

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
    #[serde(alias = "trackingCode", alias = "tracking_code")]
    barcode: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Result of a shipment-creation call
///
/// A failure here does not fail the order: it is reported and the order
/// carries on without a tracking number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ShipmentOutcome {
    #[serde(rename_all = "camelCase")]
    Created { tracking_code: String },
    Failed { reason: String },
}

/// Courier API client
#[derive(Clone)]
pub struct CourierClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl CourierClient {
    /// Create a new courier client
    pub fn new(config: &CourierConfig) -> Result<Self, CourierError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch the flat location listing
    pub async fn fetch_villes(&self) -> Result<Vec<VilleRecord>, CourierError> {
        let response = self.request(reqwest::Method::GET, "/villes").send().await?;

        if !response.status().is_success() {
            return Err(CourierError::Status(response.status()));
        }

        let records: Vec<VilleRecord> = response.json().await?;
        if records.is_empty() {
            return Err(CourierError::EmptyListing);
        }

        info!("Fetched {} courier locations", records.len());
        Ok(records)
    }

    async fn post_shipment(&self, shipment: &ShipmentRequest) -> Result<String, CourierError> {
        let response = self
            .request(reqwest::Method::POST, "/shipments")
            .json(shipment)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourierError::Status(status));
        }

        let body: ShipmentResponse = response.json().await?;
        match body.barcode.filter(|code| !code.trim().is_empty()) {
            Some(code) => Ok(code),
            None => Err(CourierError::Rejected(
                body.message
                    .unwrap_or_else(|| "no tracking code in response".to_string()),
            )),
        }
    }

    /// Create a shipment; failures are logged and reported, never raised
    pub async fn create_shipment(&self, shipment: &ShipmentRequest) -> ShipmentOutcome {
        match self.post_shipment(shipment).await {
            Ok(tracking_code) => {
                info!(
                    "Created shipment {} for order {}",
                    tracking_code, shipment.order_reference
                );
                ShipmentOutcome::Created { tracking_code }
            }
            Err(e) => {
                error!(
                    "Failed to create shipment for order {}: {}",
                    shipment.order_reference, e
                );
                ShipmentOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl VilleSource for CourierClient {
    async fn list_villes(&self) -> Result<Vec<VilleRecord>, CourierError> {
        self.fetch_villes().await
    }
}
