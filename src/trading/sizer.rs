//! Risk-managed position sizing.
//!
//! One absolute risk budget per trade makes position size shrink as the stop
//! distance widens, while the margin ceiling is an independent circuit breaker
//! against exchange-side rejection. A zero quantity result is the rejection
//! sentinel: do not trade.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{AccountBalanceView, SymbolRules};

use super::RiskConfig;

/// Inputs to one sizing decision. The balance is fetched fresh by the caller;
/// sizing itself is pure.
#[derive(Debug, Clone)]
pub struct SizingRequest<'a> {
    /// Requested notional in quote currency, before leverage.
    pub requested_notional: Decimal,

    /// Just-refreshed mark/last price; must be positive.
    pub current_price: Decimal,

    pub leverage: u32,

    /// Stop-loss trigger, if the advisory supplied one. A stop equal to the
    /// current price is treated as absent.
    pub stop_loss: Option<Decimal>,

    pub balance: &'a AccountBalanceView,
}

/// Outcome of a sizing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingResult {
    /// Quantity in base currency, rounded down to the exchange precision.
    /// Zero means "reject — do not trade".
    pub quantity: Decimal,

    /// Margin this trade commits, in quote currency.
    pub margin_committed: Decimal,
}

impl SizingResult {
    fn rejected() -> Self {
        Self {
            quantity: Decimal::ZERO,
            margin_committed: Decimal::ZERO,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.quantity.is_zero()
    }
}

/// Pure calculator turning a sizing request into a safe quantity and margin
/// commitment.
pub struct PositionSizer {
    config: RiskConfig,
    rules: SymbolRules,
}

impl PositionSizer {
    pub fn new(config: RiskConfig, rules: SymbolRules) -> Self {
        Self { config, rules }
    }

    /// Size a trade. Deterministic, no side effects.
    pub fn size(&self, req: &SizingRequest) -> SizingResult {
        if req.current_price <= Decimal::ZERO {
            return SizingResult::rejected();
        }

        // Hard stops before any arithmetic.
        let available = req.balance.available_margin;
        if available < self.config.min_available_margin {
            return SizingResult::rejected();
        }
        let usable = ((available - self.config.safety_buffer) * self.config.utilization)
            .max(Decimal::ZERO);
        if usable < self.config.min_usable_margin {
            return SizingResult::rejected();
        }

        let leverage = Decimal::from(req.leverage.max(1));
        let max_risk = self.config.risk_budget(self.drawdown_pct(req.balance));

        let sl_fraction = req
            .stop_loss
            .map(|sl| (req.current_price - sl).abs() / req.current_price)
            .filter(|f| *f > Decimal::ZERO);

        let (quantity, margin_committed) = match sl_fraction {
            None => {
                // Without a stop the full clamped notional is treated as
                // committed margin.
                let committed = req.requested_notional.min(usable);
                (self.round_quantity(committed / req.current_price), committed)
            }
            Some(fraction) => {
                let by_risk = max_risk / fraction;
                let by_margin = usable * leverage;
                let position_value = (req.requested_notional * leverage)
                    .min(by_risk)
                    .min(by_margin);

                let mut margin = position_value / leverage;
                let mut value = position_value;
                if margin > usable {
                    margin = usable;
                    value = margin * leverage;
                }

                let quantity = self.round_quantity(value / req.current_price);
                // Recompute from the rounded quantity so the invariant
                // quantity * price / leverage == margin holds exactly.
                let margin = quantity * req.current_price / leverage;
                (quantity, margin)
            }
        };

        if quantity < self.rules.min_quantity
            || quantity * req.current_price < self.rules.min_notional
        {
            return SizingResult::rejected();
        }

        SizingResult {
            quantity,
            margin_committed,
        }
    }

    /// Drawdown of the wallet balance relative to the reference balance, as a
    /// percentage, floored at zero.
    fn drawdown_pct(&self, balance: &AccountBalanceView) -> Decimal {
        let reference = self.config.reference_balance;
        if reference <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        ((reference - balance.wallet_balance).max(Decimal::ZERO) / reference) * Decimal::ONE_HUNDRED
    }

    fn round_quantity(&self, quantity: Decimal) -> Decimal {
        quantity.round_dp_with_strategy(self.rules.quantity_precision, RoundingStrategy::ToZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trading::DrawdownTier;
    use rust_decimal_macros::dec;

    fn rules() -> SymbolRules {
        SymbolRules {
            min_quantity: dec!(0.0001),
            min_notional: dec!(2),
            tick_size: dec!(0.1),
            step_size: dec!(0.000001),
            quantity_precision: 6,
        }
    }

    fn balance(available: Decimal, wallet: Decimal) -> AccountBalanceView {
        AccountBalanceView {
            available_margin: available,
            used_margin: Decimal::ZERO,
            wallet_balance: wallet,
            margin_balance: wallet,
        }
    }

    #[test]
    fn test_available_margin_below_floor_rejects() {
        // Scenario B: 40 available is under the 50 floor, regardless of the
        // requested notional or leverage.
        let sizer = PositionSizer::new(RiskConfig::default(), rules());
        let bal = balance(dec!(40), dec!(40));

        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(10000),
            current_price: dec!(60000),
            leverage: 20,
            stop_loss: Some(dec!(59000)),
            balance: &bal,
        });

        assert!(result.is_rejected());
        assert_eq!(result.margin_committed, Decimal::ZERO);
    }

    #[test]
    fn test_tiny_usable_margin_rejects() {
        let mut config = RiskConfig::default();
        config.min_available_margin = dec!(10);
        let sizer = PositionSizer::new(config, rules());
        let bal = balance(dec!(12), dec!(12));

        // (12 - 5) * 0.9 = 6.3, below the 10 usable-margin minimum.
        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(100),
            current_price: dec!(60000),
            leverage: 5,
            stop_loss: None,
            balance: &bal,
        });

        assert!(result.is_rejected());
    }

    #[test]
    fn test_risk_budget_caps_position_value() {
        // Scenario C: requested 1000 at 10x vs a 200 USD budget on a 1% stop.
        // Risk cap 20000, leverage cap 10000 -> position value 10000.
        let config = RiskConfig {
            base_risk_usd: dec!(200),
            ..RiskConfig::default()
        };
        let sizer = PositionSizer::new(config, rules());
        let bal = balance(dec!(2000), dec!(1000));
        let price = dec!(60000);

        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(1000),
            current_price: price,
            leverage: 10,
            stop_loss: Some(dec!(59400)), // 1% away
            balance: &bal,
        });

        assert!(!result.is_rejected());
        assert_eq!(result.quantity, dec!(0.166666));
        // Margin tracks the rounded quantity: ~1000 USD.
        assert!((result.margin_committed - dec!(1000)).abs() < dec!(0.5));
    }

    #[test]
    fn test_margin_commitment_never_exceeds_usable() {
        let sizer = PositionSizer::new(RiskConfig::default(), rules());
        let bal = balance(dec!(100), dec!(1000));
        let usable = (dec!(100) - dec!(5)) * dec!(0.9);

        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(5000),
            current_price: dec!(60000),
            leverage: 10,
            stop_loss: Some(dec!(54000)), // wide 10% stop
            balance: &bal,
        });

        assert!(!result.is_rejected());
        assert!(result.margin_committed <= usable);
    }

    #[test]
    fn test_sizing_invariant_with_stop_loss() {
        let sizer = PositionSizer::new(RiskConfig::default(), rules());
        let bal = balance(dec!(500), dec!(1000));
        let price = dec!(60000);
        let leverage = 8u32;

        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(80),
            current_price: price,
            leverage,
            stop_loss: Some(dec!(59100)),
            balance: &bal,
        });

        assert!(!result.is_rejected());
        let reconstructed = result.quantity * price / Decimal::from(leverage);
        assert_eq!(reconstructed, result.margin_committed);
    }

    #[test]
    fn test_no_stop_loss_clamps_to_usable_margin() {
        let sizer = PositionSizer::new(RiskConfig::default(), rules());
        let bal = balance(dec!(100), dec!(1000));
        let usable = (dec!(100) - dec!(5)) * dec!(0.9); // 85.5

        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(500),
            current_price: dec!(50000),
            leverage: 5,
            stop_loss: None,
            balance: &bal,
        });

        assert!(!result.is_rejected());
        assert_eq!(result.margin_committed, usable);
        assert_eq!(result.quantity, dec!(0.00171));
    }

    #[test]
    fn test_stop_equal_to_price_uses_no_stop_path() {
        let sizer = PositionSizer::new(RiskConfig::default(), rules());
        let bal = balance(dec!(1000), dec!(1000));
        let price = dec!(50000);

        let with_zero_distance = sizer.size(&SizingRequest {
            requested_notional: dec!(100),
            current_price: price,
            leverage: 5,
            stop_loss: Some(price),
            balance: &bal,
        });
        let without_stop = sizer.size(&SizingRequest {
            requested_notional: dec!(100),
            current_price: price,
            leverage: 5,
            stop_loss: None,
            balance: &bal,
        });

        assert_eq!(with_zero_distance, without_stop);
    }

    #[test]
    fn test_quantity_below_exchange_minimum_rejects() {
        let mut exchange_rules = rules();
        exchange_rules.min_quantity = dec!(0.001);
        let sizer = PositionSizer::new(RiskConfig::default(), exchange_rules);
        let bal = balance(dec!(100), dec!(1000));

        // 20 USD at 60k is ~0.00033 BTC, under the 0.001 minimum.
        let result = sizer.size(&SizingRequest {
            requested_notional: dec!(20),
            current_price: dec!(60000),
            leverage: 1,
            stop_loss: None,
            balance: &bal,
        });

        assert!(result.is_rejected());
    }

    #[test]
    fn test_deeper_drawdown_buys_larger_size() {
        let config = RiskConfig {
            drawdown_tiers: vec![DrawdownTier {
                drawdown_pct: dec!(25),
                risk_usd: dec!(300),
            }],
            ..RiskConfig::default()
        };
        let sizer = PositionSizer::new(config, rules());

        fn request(bal: &AccountBalanceView) -> SizingRequest<'_> {
            SizingRequest {
                requested_notional: dec!(10000),
                current_price: dec!(60000),
                leverage: 10,
                stop_loss: Some(dec!(58800)), // 2% stop
                balance: bal,
            }
        }

        // Healthy wallet: base budget 100 / 0.02 = 5000 position value.
        let healthy = balance(dec!(5000), dec!(1000));
        let normal = sizer.size(&request(&healthy));

        // 40% drawdown: escalated budget 300 / 0.02 = 15000 position value.
        let drawn_down = balance(dec!(5000), dec!(600));
        let escalated = sizer.size(&request(&drawn_down));

        assert!(escalated.quantity > normal.quantity);
    }
}
