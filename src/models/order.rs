//! Order-side types: direction, price levels, intents, handles, symbol rules.

use rust_decimal::Decimal;

/// Trade direction. Determines sign conventions for every price comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order side string the exchange expects (`side` parameter).
    pub fn order_side(&self) -> &'static str {
        match self {
            Side::Long => "BUY",
            Side::Short => "SELL",
        }
    }

    /// Position side string for hedge-mode endpoints (`positionSide`,
    /// leverage setting).
    pub fn position_side(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }
}

/// Stop-loss / take-profit trigger prices attached to an order intent.
///
/// After `StopGuard::finalize` runs: for `Long`,
/// `stop_loss < current_price < take_profit`; for `Short` the mirror holds,
/// and the stop sits at least the configured minimum distance from price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriceLevels {
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Fully validated, ready-to-submit order description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIntent {
    pub side: Side,
    pub quantity: Decimal,
    pub levels: PriceLevels,
}

/// Lifecycle status of an order as reported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Closed,
    Unknown,
}

impl OrderStatus {
    /// Map the exchange status string onto the lifecycle enum. Anything
    /// unrecognized is `Unknown`, which monitoring treats as terminal.
    pub fn from_exchange(status: &str) -> Self {
        match status {
            "NEW" | "PENDING" => OrderStatus::New,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELLED" | "CANCELED" | "EXPIRED" | "CLOSED" => OrderStatus::Closed,
            _ => OrderStatus::Unknown,
        }
    }

    /// Whether the order is still working on the exchange.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

/// Cached view of an exchange order. The exchange is the single source of
/// truth; this is invalidated by polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderHandle {
    pub order_id: String,
    pub status: OrderStatus,
}

/// Trading rules the exchange declares per contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRules {
    /// Smallest tradable quantity in base currency.
    pub min_quantity: Decimal,

    /// Smallest tradable notional in quote currency.
    pub min_notional: Decimal,

    /// Price increment.
    pub tick_size: Decimal,

    /// Quantity increment.
    pub step_size: Decimal,

    /// Decimal places implied by `step_size`; quantities round down to this.
    pub quantity_precision: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(OrderStatus::from_exchange("NEW"), OrderStatus::New);
        assert_eq!(
            OrderStatus::from_exchange("PARTIALLY_FILLED"),
            OrderStatus::PartiallyFilled
        );
        assert_eq!(OrderStatus::from_exchange("FILLED"), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_exchange("CANCELLED"), OrderStatus::Closed);
        assert_eq!(OrderStatus::from_exchange("whatever"), OrderStatus::Unknown);
    }

    #[test]
    fn test_open_statuses() {
        assert!(OrderStatus::New.is_open());
        assert!(OrderStatus::PartiallyFilled.is_open());
        assert!(!OrderStatus::Filled.is_open());
        assert!(!OrderStatus::Closed.is_open());
        assert!(!OrderStatus::Unknown.is_open());
    }

    #[test]
    fn test_side_encodings() {
        assert_eq!(Side::Long.order_side(), "BUY");
        assert_eq!(Side::Long.position_side(), "LONG");
        assert_eq!(Side::Short.order_side(), "SELL");
        assert_eq!(Side::Short.position_side(), "SHORT");
    }
}
