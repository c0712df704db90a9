//! Snapshot loading
//!
//! Seeds the entity cache from the REST API when a wallet is selected.
//! Positions load first; prices only load once positions succeeded.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use tracker_core::{Position, Price, TrackerError, TrackerResult, WalletAddress};
use tracker_reya::ReyaClient;

use crate::cache::EntityCache;

/// Source of one-shot snapshots
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_positions(&self, address: &WalletAddress) -> TrackerResult<Vec<Position>>;

    async fn load_prices(&self) -> TrackerResult<Vec<Price>>;
}

#[async_trait]
impl SnapshotSource for ReyaClient {
    async fn load_positions(&self, address: &WalletAddress) -> TrackerResult<Vec<Position>> {
        self.get_wallet_positions(address).await
    }

    async fn load_prices(&self) -> TrackerResult<Vec<Price>> {
        self.get_prices().await
    }
}

/// What a snapshot load ended with
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// Positions loaded; `prices` is `None` if the price request failed
    Loaded {
        positions: usize,
        prices: Option<usize>,
    },
    /// Positions failed, prices were not requested
    PositionsFailed(TrackerError),
}

/// Applies snapshots to the cache
#[derive(Clone)]
pub struct SnapshotLoader {
    source: Arc<dyn SnapshotSource>,
    cache: Arc<EntityCache>,
}

impl SnapshotLoader {
    pub fn new(source: Arc<dyn SnapshotSource>, cache: Arc<EntityCache>) -> Self {
        Self { source, cache }
    }

    /// Load positions for `address`, then prices
    ///
    /// A failed position load empties the position table and records a
    /// user-facing message on it. A failed price load keeps whatever
    /// prices were cached.
    pub async fn load(&self, address: &WalletAddress) -> SnapshotOutcome {
        self.cache.positions_mut().begin_load();

        let positions = match self.source.load_positions(address).await {
            Ok(positions) => positions,
            Err(e) => {
                warn!("Failed to fetch positions for {}: {}", address.short(), e);
                self.cache.positions_mut().fail_load(e.user_message());
                return SnapshotOutcome::PositionsFailed(e);
            }
        };

        let position_count = positions.len();
        self.cache.positions_mut().finish_load(positions);
        info!(
            "Loaded {} positions for {}",
            position_count,
            address.short()
        );

        self.cache.prices_mut().set_loading(true);
        let prices = match self.source.load_prices().await {
            Ok(prices) => {
                let count = prices.len();
                self.cache.prices_mut().replace_all(prices);
                info!("Loaded {} prices", count);
                Some(count)
            }
            Err(e) => {
                warn!("Failed to fetch prices: {}", e);
                None
            }
        };
        self.cache.prices_mut().set_loading(false);

        SnapshotOutcome::Loaded {
            positions: position_count,
            prices,
        }
    }
}

impl std::fmt::Debug for SnapshotLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotLoader").finish_non_exhaustive()
    }
}
