//! API route definitions

mod health;
mod positions;
mod prices;
mod status;
mod wallet;

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracker_core::TrackerError;

use crate::AppState;

/// Create all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(positions::routes())
        .merge(prices::routes())
        .merge(status::routes())
        .merge(wallet::routes())
}

/// Full application: `/health` and `/api/*` behind request tracing and CORS
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .nest("/api", api_routes())
        .merge(health::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Status code for a tracker error
pub fn status_for(error: &TrackerError) -> StatusCode {
    match error {
        TrackerError::InvalidAddress(_) => StatusCode::BAD_REQUEST,
        TrackerError::Server(_) | TrackerError::Transport(_) | TrackerError::Parse(_) => {
            StatusCode::BAD_GATEWAY
        }
        TrackerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(error: &TrackerError) -> Response {
    (
        status_for(error),
        Json(ErrorResponse {
            error: error.user_message(),
        }),
    )
        .into_response()
}
