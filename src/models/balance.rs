//! Snapshot of exchange margin state.

use rust_decimal::Decimal;

/// Margin state of the futures account, in quote currency.
///
/// Produced fresh on every sizing decision and never cached across cycles:
/// margin moves with every fill and fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountBalanceView {
    /// Margin currently free to open new positions.
    pub available_margin: Decimal,

    /// Margin locked by open positions and orders.
    pub used_margin: Decimal,

    /// Total wallet balance (deposits plus realized P&L).
    pub wallet_balance: Decimal,

    /// Wallet balance plus unrealized P&L.
    pub margin_balance: Decimal,
}
