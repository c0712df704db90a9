//! Positions table endpoint

use axum::{extract::State, response::Json, routing::get, Router};
use tracker_services::{positions_view, PositionsView};

use crate::AppState;

/// Current positions joined with live prices
async fn get_positions(State(state): State<AppState>) -> Json<PositionsView> {
    Json(positions_view(&state.cache))
}

/// Create position routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/positions", get(get_positions))
}
