//! OHLCV candle.

use rust_decimal::Decimal;

/// A single kline as returned by the exchange, oldest-first after sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candle {
    /// Open time in epoch milliseconds.
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}
