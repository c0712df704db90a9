//! Mark prices published for each market

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Price data from `GET /prices` or the `/v2/prices` channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub symbol: String,

    /// Oracle price, used as the mark price
    pub oracle_price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_price: Option<Decimal>,

    /// Update time in epoch milliseconds
    #[serde(default)]
    pub updated_at: i64,
}

impl Price {
    pub fn new(symbol: impl Into<String>, oracle_price: Decimal, updated_at: i64) -> Self {
        Self {
            symbol: symbol.into(),
            oracle_price,
            pool_price: None,
            updated_at,
        }
    }
}
