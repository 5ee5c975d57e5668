//! Recommendation gate: turns a parsed advisory into a bounded trade action.
//!
//! The advisory is untrusted input. The gate is total: missing fields get
//! defaults, out-of-range fields get clamped, anything that is not a clear
//! buy or sell becomes a hold.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Direction, PriceLevels, Recommendation, Side};

use super::GateConfig;

/// What the bot should do with the current cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Hold {
        reason: String,
    },
    Execute {
        side: Side,
        notional: Decimal,
        leverage: u32,
        levels: PriceLevels,
    },
}

pub struct RecommendationGate {
    config: GateConfig,
}

impl RecommendationGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, rec: &Recommendation) -> Action {
        let side = match rec.direction {
            Direction::Buy => Side::Long,
            Direction::Sell => Side::Short,
            Direction::Hold => {
                let reason = if rec.reason.is_empty() {
                    "no actionable signal".to_string()
                } else {
                    rec.reason.clone()
                };
                return Action::Hold { reason };
            }
        };

        let notional = rec
            .amount
            .unwrap_or(self.config.default_notional)
            .clamp(self.config.min_notional, self.config.max_notional);
        let leverage = rec
            .leverage
            .unwrap_or(self.config.default_leverage)
            .clamp(self.config.min_leverage, self.config.max_leverage);

        debug!(
            side = side.position_side(),
            %notional,
            leverage,
            "recommendation accepted"
        );

        Action::Execute {
            side,
            notional,
            leverage,
            levels: PriceLevels {
                stop_loss: rec.stop_loss,
                take_profit: rec.take_profit,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gate() -> RecommendationGate {
        RecommendationGate::new(GateConfig::default())
    }

    fn buy_rec() -> Recommendation {
        Recommendation {
            direction: Direction::Buy,
            amount: Some(dec!(60)),
            leverage: Some(8),
            stop_loss: Some(dec!(59000)),
            take_profit: Some(dec!(62000)),
            reason: "trend continuation".to_string(),
        }
    }

    #[test]
    fn test_buy_becomes_long_execute() {
        let action = gate().decide(&buy_rec());

        assert_eq!(
            action,
            Action::Execute {
                side: Side::Long,
                notional: dec!(60),
                leverage: 8,
                levels: PriceLevels {
                    stop_loss: Some(dec!(59000)),
                    take_profit: Some(dec!(62000)),
                },
            }
        );
    }

    #[test]
    fn test_sell_becomes_short_execute() {
        let mut rec = buy_rec();
        rec.direction = Direction::Sell;

        match gate().decide(&rec) {
            Action::Execute { side, .. } => assert_eq!(side, Side::Short),
            other => panic!("expected execute, got {other:?}"),
        }
    }

    #[test]
    fn test_hold_carries_the_advisory_reason() {
        let rec = Recommendation {
            direction: Direction::Hold,
            reason: "mixed signals, stay flat".to_string(),
            ..Recommendation::default()
        };

        assert_eq!(
            gate().decide(&rec),
            Action::Hold {
                reason: "mixed signals, stay flat".to_string()
            }
        );
    }

    #[test]
    fn test_hold_without_reason_gets_a_default() {
        let rec = Recommendation::default();

        match gate().decide(&rec) {
            Action::Hold { reason } => assert_eq!(reason, "no actionable signal"),
            other => panic!("expected hold, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_amount_and_leverage_use_defaults() {
        let mut rec = buy_rec();
        rec.amount = None;
        rec.leverage = None;

        match gate().decide(&rec) {
            Action::Execute {
                notional, leverage, ..
            } => {
                assert_eq!(notional, dec!(50));
                assert_eq!(leverage, 5);
            }
            other => panic!("expected execute, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut rec = buy_rec();
        rec.amount = Some(dec!(5000));
        rec.leverage = Some(125);

        match gate().decide(&rec) {
            Action::Execute {
                notional, leverage, ..
            } => {
                assert_eq!(notional, dec!(100));
                assert_eq!(leverage, 20);
            }
            other => panic!("expected execute, got {other:?}"),
        }

        rec.amount = Some(dec!(1));
        rec.leverage = Some(0);
        match gate().decide(&rec) {
            Action::Execute {
                notional, leverage, ..
            } => {
                assert_eq!(notional, dec!(20));
                assert_eq!(leverage, 1);
            }
            other => panic!("expected execute, got {other:?}"),
        }
    }
}
