//! Tracker status endpoint

use axum::{extract::State, response::Json, routing::get, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use tracker_core::{ConnectionState, WalletAddress};
use tracker_services::StreamStats;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub wallet: Option<WalletAddress>,
    pub connection: ConnectionState,
    pub reconnect_pending: bool,
    pub positions: usize,
    pub prices: usize,
    /// Minimum price move, in basis points, that updates a cached price
    pub price_threshold_bips: Decimal,
    pub stream: StreamStats,
}

/// Active wallet, connection state and stream counters
async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let stream = state.stream.status();
    let (prices, price_threshold_bips) = {
        let table = state.cache.prices();
        (table.len(), table.threshold_bips())
    };

    Json(StatusResponse {
        wallet: state.wallet.current(),
        connection: stream.state,
        reconnect_pending: stream.reconnect_pending,
        positions: state.cache.positions().len(),
        prices,
        price_threshold_bips,
        stream: stream.stats,
    })
}

/// Create status routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}
