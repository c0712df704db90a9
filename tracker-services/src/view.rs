//! Positions table as presented to a user
//!
//! Joins each cached position with the live price of its market. When no
//! price is cached for the symbol the entry price stands in, and the row
//! says so.

use rust_decimal::Decimal;
use serde::Serialize;

use tracker_core::{base_asset, Position, Side};

use crate::cache::{EntityCache, PriceTable};

/// Where a row's mark price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkSource {
    Oracle,
    EntryPrice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    pub symbol: String,
    /// Base asset, e.g. `BTC` for `BTCRUSDPERP`
    pub market: String,
    pub account_id: u64,
    pub side: Side,
    pub is_long: bool,
    /// Absolute position size
    pub size: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub mark_source: MarkSource,
    /// `size * mark_price`
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionsView {
    pub rows: Vec<PositionRow>,
    pub total_value: Decimal,
    pub loading: bool,
    /// Message shown in place of the table when the snapshot failed
    pub error: Option<String>,
}

/// Mark price of a position: live oracle price, else its entry price
pub fn mark_price(position: &Position, prices: &PriceTable) -> (Decimal, MarkSource) {
    match prices.oracle_price(&position.symbol) {
        Some(price) => (price, MarkSource::Oracle),
        None => (position.avg_entry_price, MarkSource::EntryPrice),
    }
}

pub fn position_row(position: &Position, prices: &PriceTable) -> PositionRow {
    let (mark, source) = mark_price(position, prices);
    PositionRow {
        symbol: position.symbol.clone(),
        market: base_asset(&position.symbol).to_string(),
        account_id: position.account_id,
        side: position.side,
        is_long: position.side.is_long(),
        size: position.size(),
        entry_price: position.avg_entry_price,
        mark_price: mark,
        mark_source: source,
        value: position.value_at(mark),
    }
}

/// Build the positions table from the current cache contents
pub fn positions_view(cache: &EntityCache) -> PositionsView {
    let (positions, loading, error) = {
        let table = cache.positions();
        (
            table.list(),
            table.is_loading(),
            table.error().map(str::to_string),
        )
    };

    let prices = cache.prices();
    let rows: Vec<PositionRow> = positions
        .iter()
        .map(|p| position_row(p, &prices))
        .collect();
    let total_value = rows.iter().map(|r| r.value).sum();

    PositionsView {
        rows,
        total_value,
        loading,
        error,
    }
}
