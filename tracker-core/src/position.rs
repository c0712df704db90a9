//! Perpetual positions held by a wallet

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Side of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Bid side ("B")
    #[serde(rename = "B")]
    Long,
    /// Ask side ("A")
    #[serde(rename = "A")]
    Short,
}

impl Side {
    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }
}

/// A position as reported by `GET /wallet/{address}/positions` and the
/// per-wallet positions channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    #[serde(default)]
    pub exchange_id: u64,

    /// Market symbol, e.g. `BTCRUSDPERP`
    pub symbol: String,

    /// Margin account holding the position
    pub account_id: u64,

    /// Position size; zero means the position is closed
    pub qty: Decimal,

    pub side: Side,

    pub avg_entry_price: Decimal,

    #[serde(default)]
    pub avg_entry_funding_value: Decimal,

    /// Increases with every trade on this symbol
    #[serde(default)]
    pub last_trade_sequence_number: u64,
}

impl Position {
    /// Cache key of this position
    pub fn key(&self) -> PositionKey {
        PositionKey {
            account_id: self.account_id,
            symbol: self.symbol.clone(),
        }
    }

    /// A zero-quantity position is closed and must not be kept
    pub fn is_closed(&self) -> bool {
        self.qty.is_zero()
    }

    /// Absolute size of the position
    pub fn size(&self) -> Decimal {
        self.qty.abs()
    }

    /// Notional value at the given mark price
    pub fn value_at(&self, mark_price: Decimal) -> Decimal {
        self.size() * mark_price
    }
}

/// Identity of a position in the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub account_id: u64,
    pub symbol: String,
}

/// Extract the base asset from a trading symbol
///
/// `BTCRUSDPERP` -> `BTC`, `kBONKRUSDPERP` -> `kBONK`
pub fn base_asset(symbol: &str) -> &str {
    let base = symbol.strip_suffix("RUSDPERP").unwrap_or(symbol);
    let base = base.strip_suffix("RUSD").unwrap_or(base);
    if base.is_empty() {
        symbol
    } else {
        base
    }
}
