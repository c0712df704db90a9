//! Cached prices endpoint

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tracker_core::Price;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PricesResponse {
    pub prices: Vec<Price>,
    pub count: usize,
    pub loading: bool,
}

/// Every cached price, ordered by symbol
async fn get_prices(State(state): State<AppState>) -> Json<PricesResponse> {
    let table = state.cache.prices();
    let prices = table.list();

    Json(PricesResponse {
        count: prices.len(),
        prices,
        loading: table.is_loading(),
    })
}

/// Create price routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/prices", get(get_prices))
}
