//! Wallet selection endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracker_core::WalletAddress;
use tracker_services::{SessionTransition, SnapshotOutcome};

use super::error_response;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetWalletRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletResponse {
    pub wallet: Option<WalletAddress>,
    /// activated, switched, cleared or unchanged
    pub transition: &'static str,
    /// Set when the positions snapshot could not be loaded
    pub positions_error: Option<String>,
}

impl WalletResponse {
    fn new(wallet: Option<WalletAddress>, transition: &SessionTransition) -> Self {
        let (name, outcome) = match transition {
            SessionTransition::Activated(outcome) => ("activated", Some(outcome)),
            SessionTransition::Switched(outcome) => ("switched", Some(outcome)),
            SessionTransition::Cleared => ("cleared", None),
            SessionTransition::Unchanged => ("unchanged", None),
        };

        let positions_error = match outcome {
            Some(SnapshotOutcome::PositionsFailed(e)) => Some(e.user_message()),
            _ => None,
        };

        Self {
            wallet,
            transition: name,
            positions_error,
        }
    }
}

/// Validate and track a wallet
async fn set_wallet(
    State(state): State<AppState>,
    Json(request): Json<SetWalletRequest>,
) -> Response {
    let address = match WalletAddress::parse(&request.address) {
        Ok(address) => address,
        Err(e) => {
            info!("Rejected wallet address {:?}: {}", request.address, e);
            return error_response(&e);
        }
    };

    let mut session = state.session.lock().await;
    let transition = session.set_address(Some(address)).await;

    (
        StatusCode::OK,
        Json(WalletResponse::new(session.current(), &transition)),
    )
        .into_response()
}

/// Stop tracking the current wallet
async fn clear_wallet(State(state): State<AppState>) -> Response {
    let mut session = state.session.lock().await;
    let transition = session.set_address(None).await;

    (StatusCode::OK, Json(WalletResponse::new(None, &transition))).into_response()
}

/// Create wallet routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/wallet", put(set_wallet).delete(clear_wallet))
}
