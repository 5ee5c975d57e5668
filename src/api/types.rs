//! Typed exchange response payloads.
//!
//! Every endpoint answers in a `{ code, msg, data }` envelope; `code == 0` is
//! success. Numeric amounts arrive as strings and are parsed into `Decimal`
//! at the client boundary.

use serde::Deserialize;

/// Standard response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

/// One kline from the candles endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KlineData {
    pub time: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// Latest mark/last price for a symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceData {
    pub price: String,
}

/// Wrapper around the account balance payload.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceData {
    pub balance: BalanceDetail,
}

/// Margin balance fields we rely on. Absence of any of them is treated as
/// `DataUnavailable` upstream, not a crash.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDetail {
    #[serde(default)]
    pub available_margin: Option<String>,
    #[serde(default)]
    pub used_margin: Option<String>,
    #[serde(default)]
    pub balance: Option<String>,
    #[serde(default)]
    pub equity: Option<String>,
}

/// Order fields shared by placement, status, and open-orders responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order_id: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub symbol: String,
}

/// `data` payload wrapping a single order.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderData {
    pub order: OrderDetail,
}

/// `data` payload of the open-orders listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenOrdersData {
    #[serde(default)]
    pub orders: Vec<OrderDetail>,
}

/// One open position from the positions endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub position_side: String,
    #[serde(default)]
    pub position_amt: String,
}

/// Per-contract trading rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractData {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub trade_min_quantity: f64,
    #[serde(rename = "tradeMinUSDT", default)]
    pub trade_min_usdt: f64,
    #[serde(default)]
    pub quantity_precision: u32,
    #[serde(default)]
    pub price_precision: u32,
}
