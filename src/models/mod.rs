//! Data models for balances, candles, orders, and advisory recommendations.

mod balance;
mod candle;
mod order;
mod recommendation;

pub use balance::AccountBalanceView;
pub use candle::Candle;
pub use order::{OrderHandle, OrderIntent, OrderStatus, PriceLevels, Side, SymbolRules};
pub use recommendation::{Direction, Recommendation};
