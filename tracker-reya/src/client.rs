//! Reya REST API client
//!
//! One-shot snapshot requests used to seed the cache before streaming:
//! the open positions of a wallet and the current price of every market.

use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};
use tracker_core::{Position, Price, TrackerError, TrackerResult, WalletAddress};

/// Base URL for the Reya v2 REST API
pub const REYA_API_BASE: &str = "https://api.reya.xyz/v2";

/// Reya API client
#[derive(Clone)]
pub struct ReyaClient {
    client: Client,
    base_url: String,
}

impl ReyaClient {
    /// Create a client against the production API
    pub fn new() -> TrackerResult<Self> {
        Self::with_base_url(REYA_API_BASE)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| TrackerError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch all open positions for a wallet
    #[instrument(skip(self))]
    pub async fn get_wallet_positions(
        &self,
        address: &WalletAddress,
    ) -> TrackerResult<Vec<Position>> {
        let url = format!("{}/wallet/{}/positions", self.base_url, address.as_str());
        debug!("Fetching Reya positions from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::transport(format!("Failed to fetch positions: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, Endpoint::Positions));
        }

        let positions: Vec<Position> = response.json().await.map_err(|e| {
            TrackerError::parse(format!("Failed to parse positions response: {}", e))
        })?;

        debug!("Fetched {} positions for {}", positions.len(), address.short());
        Ok(positions)
    }

    /// Fetch the current price of every market
    #[instrument(skip(self))]
    pub async fn get_prices(&self) -> TrackerResult<Vec<Price>> {
        let url = format!("{}/prices", self.base_url);
        debug!("Fetching Reya prices from: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TrackerError::transport(format!("Failed to fetch prices: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status, Endpoint::Prices));
        }

        let prices: Vec<Price> = response
            .json()
            .await
            .map_err(|e| TrackerError::parse(format!("Failed to parse prices response: {}", e)))?;

        debug!("Fetched {} prices", prices.len());
        Ok(prices)
    }
}

impl std::fmt::Debug for ReyaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReyaClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Snapshot endpoints, which differ in how a 400 is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Positions,
    Prices,
}

impl Endpoint {
    fn resource(&self) -> &'static str {
        match self {
            Endpoint::Positions => "positions",
            Endpoint::Prices => "prices",
        }
    }
}

/// Map a non-success status to the snapshot error taxonomy
pub fn classify_status(status: StatusCode, endpoint: Endpoint) -> TrackerError {
    let reason = status.canonical_reason().unwrap_or("Unknown status");

    if status == StatusCode::BAD_REQUEST && endpoint == Endpoint::Positions {
        return TrackerError::invalid_address("Invalid wallet address format");
    }
    if status.is_server_error() {
        return TrackerError::server(format!("{} {}", status.as_u16(), reason));
    }
    TrackerError::transport(format!("Failed to fetch {}: {}", endpoint.resource(), reason))
}
