//! Entity Cache
//!
//! In-memory tables for the positions of the tracked wallet and the prices
//! of every market. Both tables are plain data structures with merge rules;
//! `EntityCache` wraps them in locks and is shared as `Arc<EntityCache>`
//! between the snapshot loader, the stream client and readers.
//!
//! Cache operations never fail. Parsing and validation happen before data
//! gets here.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;
use tracker_core::{should_accept, Position, PositionKey, Price, DEFAULT_THRESHOLD_BIPS};

/// Result of merging a batch of position deltas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Entries inserted or overwritten
    pub upserted: usize,
    /// Entries removed because their quantity reached zero
    pub removed: usize,
    /// Deltas dropped because the cached entry has a newer trade sequence
    pub stale: usize,
}

// ============================================================================
// Positions
// ============================================================================

/// Open positions of the tracked wallet, keyed by `(account_id, symbol)`
#[derive(Debug, Default)]
pub struct PositionTable {
    positions: HashMap<PositionKey, Position>,
    loading: bool,
    error: Option<String>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table with a snapshot
    pub fn replace_all(&mut self, positions: Vec<Position>) {
        self.positions = positions
            .into_iter()
            .filter(|p| !p.is_closed())
            .map(|p| (p.key(), p))
            .collect();
    }

    /// Merge a delta batch
    ///
    /// Zero-quantity entries delete their key, everything else is inserted
    /// or overwritten. Keys absent from the batch are left alone. A delta
    /// whose trade sequence is lower than the cached one arrived out of
    /// order and is dropped; sequence 0 means the push carried none and the
    /// cached sequence is kept as the watermark.
    pub fn apply_updates(&mut self, updates: Vec<Position>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for mut update in updates {
            let key = update.key();

            if let Some(existing) = self.positions.get(&key) {
                let seq = update.last_trade_sequence_number;
                if seq == 0 {
                    update.last_trade_sequence_number = existing.last_trade_sequence_number;
                } else if seq < existing.last_trade_sequence_number {
                    debug!(
                        "Dropping stale position delta for {} (seq {} < {})",
                        key.symbol, seq, existing.last_trade_sequence_number
                    );
                    summary.stale += 1;
                    continue;
                }
            }

            if update.is_closed() {
                if self.positions.remove(&key).is_some() {
                    summary.removed += 1;
                }
            } else {
                self.positions.insert(key, update);
                summary.upserted += 1;
            }
        }

        summary
    }

    /// Empty the table and forget any load error
    pub fn clear(&mut self) {
        self.positions.clear();
        self.error = None;
        self.loading = false;
    }

    /// Mark a snapshot load as started
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Finish a snapshot load with its result
    pub fn finish_load(&mut self, positions: Vec<Position>) {
        self.replace_all(positions);
        self.loading = false;
    }

    /// Record a failed snapshot load; the table is emptied
    pub fn fail_load(&mut self, message: impl Into<String>) {
        self.positions.clear();
        self.error = Some(message.into());
        self.loading = false;
    }

    pub fn get(&self, key: &PositionKey) -> Option<&Position> {
        self.positions.get(key)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// All positions, ordered by symbol then account
    pub fn list(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| {
            a.symbol
                .cmp(&b.symbol)
                .then_with(|| a.account_id.cmp(&b.account_id))
        });
        positions
    }
}

// ============================================================================
// Prices
// ============================================================================

/// Latest accepted price per symbol
#[derive(Debug)]
pub struct PriceTable {
    prices: HashMap<String, Price>,
    threshold_bips: Decimal,
    loading: bool,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_BIPS)
    }
}

impl PriceTable {
    pub fn new(threshold_bips: Decimal) -> Self {
        Self {
            prices: HashMap::new(),
            threshold_bips,
            loading: false,
        }
    }

    pub fn threshold_bips(&self) -> Decimal {
        self.threshold_bips
    }

    /// Replace the whole table, bypassing the deviation filter
    pub fn replace_all(&mut self, prices: Vec<Price>) {
        self.prices = prices
            .into_iter()
            .map(|p| (p.symbol.clone(), p))
            .collect();
    }

    /// Insert a price if it is new or moved past the deviation threshold
    ///
    /// Returns whether the price was stored.
    pub fn upsert_one(&mut self, price: Price) -> bool {
        let accept = match self.prices.get(&price.symbol) {
            None => true,
            Some(existing) => {
                should_accept(existing.oracle_price, price.oracle_price, self.threshold_bips)
            }
        };

        if accept {
            self.prices.insert(price.symbol.clone(), price);
        }
        accept
    }

    /// Apply [`PriceTable::upsert_one`] to each price; returns how many were stored
    pub fn upsert_batch(&mut self, prices: Vec<Price>) -> usize {
        prices
            .into_iter()
            .map(|p| self.upsert_one(p))
            .filter(|accepted| *accepted)
            .count()
    }

    pub fn clear(&mut self) {
        self.prices.clear();
        self.loading = false;
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn get(&self, symbol: &str) -> Option<&Price> {
        self.prices.get(symbol)
    }

    /// Live oracle price for a symbol
    pub fn oracle_price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).map(|p| p.oracle_price)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// All prices, ordered by symbol
    pub fn list(&self) -> Vec<Price> {
        let mut prices: Vec<Price> = self.prices.values().cloned().collect();
        prices.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        prices
    }
}

// ============================================================================
// Shared cache
// ============================================================================

/// Positions and prices behind their own locks
///
/// The two tables evolve independently; nothing here ties a price update
/// to a position update for the same symbol.
#[derive(Debug, Default)]
pub struct EntityCache {
    positions: RwLock<PositionTable>,
    prices: RwLock<PriceTable>,
}

impl EntityCache {
    /// Create a cache with the given price deviation threshold
    pub fn new(threshold_bips: Decimal) -> Self {
        Self {
            positions: RwLock::new(PositionTable::new()),
            prices: RwLock::new(PriceTable::new(threshold_bips)),
        }
    }

    pub fn positions(&self) -> RwLockReadGuard<'_, PositionTable> {
        self.positions.read()
    }

    pub fn positions_mut(&self) -> RwLockWriteGuard<'_, PositionTable> {
        self.positions.write()
    }

    pub fn prices(&self) -> RwLockReadGuard<'_, PriceTable> {
        self.prices.read()
    }

    pub fn prices_mut(&self) -> RwLockWriteGuard<'_, PriceTable> {
        self.prices.write()
    }

    /// Empty both tables
    pub fn clear_all(&self) {
        self.positions.write().clear();
        self.prices.write().clear();
    }
}
