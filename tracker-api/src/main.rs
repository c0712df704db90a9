//! Reya Wallet Position Tracker API Server
//!
//! Tracks the open positions of one wallet against live Reya prices and
//! serves them over HTTP.

mod routes;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracker_reya::ReyaClient;
use tracker_services::{
    spawn_ws_stream, EntityCache, SessionController, SessionTransition, SnapshotLoader,
    StreamControl, StreamHandle, TrackerConfig, WalletStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<EntityCache>,
    pub wallet: Arc<WalletStore>,
    pub stream: StreamHandle,
    /// Wallet transitions run one at a time
    pub session: Arc<Mutex<SessionController<StreamHandle>>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env.local file
    if let Err(e) = dotenvy::from_filename(".env.local") {
        // Not an error if the file doesn't exist
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env.local: {}", e);
        }
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tracker_api=debug,tracker_services=debug")),
        )
        .init();

    info!("Starting Reya Wallet Position Tracker");

    let config = TrackerConfig::from_env()?;
    info!("REST: {}, stream: {}", config.api_url, config.ws_url);

    let cache = Arc::new(EntityCache::new(config.price_threshold_bips));

    info!("Wallet state file: {}", config.state_file.display());
    let wallet = Arc::new(WalletStore::open(&config.state_file));
    if let Some(address) = config.initial_wallet.clone() {
        info!("Using TRACKER_WALLET {}", address.short());
        if let Err(e) = wallet.set(Some(address)) {
            warn!("Failed to persist TRACKER_WALLET: {}", e);
        }
    }

    let (stream, stream_task) = spawn_ws_stream(
        &config.ws_url,
        config.reconnect_delay,
        cache.clone(),
        wallet.subscribe(),
    );

    // Log connection state transitions
    let mut states = stream.subscribe_state();
    tokio::spawn(async move {
        loop {
            match states.recv().await {
                Ok(state) => info!("[Reya WS] Connection state: {:?}", state),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("[Reya WS] Missed {} state notifications", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let client = ReyaClient::with_base_url(&config.api_url)?;
    let loader = SnapshotLoader::new(Arc::new(client), cache.clone());
    let mut controller =
        SessionController::new(wallet.clone(), cache.clone(), loader, stream.clone());

    if let SessionTransition::Activated(outcome) = controller.resume().await {
        info!("Session resumed: {:?}", outcome);
    } else {
        info!("No wallet selected yet, waiting for PUT /api/wallet");
    }

    let state = AppState {
        cache,
        wallet,
        stream: stream.clone(),
        session: Arc::new(Mutex::new(controller)),
    };

    let app = routes::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down stream");
    stream.stop().await;
    stream_task.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
