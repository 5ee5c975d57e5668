//! Trading configuration.
//!
//! The numeric tiers and offsets here are tuned heuristics, not invariants:
//! what must hold is the shape (monotonic step escalation bounded by a
//! ceiling, minimum stop distances, reward:risk floor). Everything is a value
//! so a deployment can re-tune without touching the core.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// One step of the drawdown-adaptive risk schedule: at drawdowns strictly
/// above `drawdown_pct`, risk `risk_usd` per trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownTier {
    pub drawdown_pct: Decimal,
    pub risk_usd: Decimal,
}

/// Capital-preservation limits for position sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Margin reserved for fees and slippage before anything is committed.
    pub safety_buffer: Decimal,

    /// Fraction of the remaining margin a single trade may ever commit.
    pub utilization: Decimal,

    /// Absolute floor: below this available margin, no trade at all.
    pub min_available_margin: Decimal,

    /// Minimum usable margin worth trading with.
    pub min_usable_margin: Decimal,

    /// Risk budget per trade in the normal (low-drawdown) state.
    pub base_risk_usd: Decimal,

    /// Hard ceiling on the per-trade risk budget.
    pub risk_ceiling_usd: Decimal,

    /// Escalation tiers, ascending by drawdown. Deeper drawdown buys a larger
    /// absolute budget to accelerate recovery.
    pub drawdown_tiers: Vec<DrawdownTier>,

    /// Balance the drawdown percentage is measured against.
    pub reference_balance: Decimal,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            safety_buffer: dec!(5),
            utilization: dec!(0.9),
            min_available_margin: dec!(50),
            min_usable_margin: dec!(10),
            base_risk_usd: dec!(100),
            risk_ceiling_usd: dec!(400),
            drawdown_tiers: vec![
                DrawdownTier {
                    drawdown_pct: dec!(10),
                    risk_usd: dec!(150),
                },
                DrawdownTier {
                    drawdown_pct: dec!(25),
                    risk_usd: dec!(225),
                },
                DrawdownTier {
                    drawdown_pct: dec!(50),
                    risk_usd: dec!(350),
                },
            ],
            reference_balance: dec!(1000),
        }
    }
}

impl RiskConfig {
    /// Risk budget for the given drawdown percentage. A monotonic step
    /// function: exact tier boundaries resolve to the lower (more
    /// conservative) tier, and the ceiling always wins.
    pub fn risk_budget(&self, drawdown_pct: Decimal) -> Decimal {
        let budget = self
            .drawdown_tiers
            .iter()
            .filter(|t| drawdown_pct > t.drawdown_pct)
            .map(|t| t.risk_usd)
            .last()
            .unwrap_or(self.base_risk_usd);

        budget.min(self.risk_ceiling_usd)
    }
}

/// Stop-loss / take-profit repair rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopConfig {
    /// Fractional offset used when a proposed SL is on the wrong side.
    pub fallback_sl_pct: Decimal,

    /// Fractional offset used when a proposed TP is on the wrong side.
    pub fallback_tp_pct: Decimal,

    /// Minimum SL distance as a fraction of price.
    pub min_sl_distance_pct: Decimal,

    /// Minimum take-profit distance relative to stop distance.
    pub min_reward_risk: Decimal,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            fallback_sl_pct: dec!(0.005),   // 0.5% behind price
            fallback_tp_pct: dec!(0.015),   // 1.5% past price
            min_sl_distance_pct: dec!(0.002), // 0.2% of price
            min_reward_risk: dec!(1.5),
        }
    }
}

/// Defaults and bounds applied to advisory recommendations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    pub default_notional: Decimal,
    pub min_notional: Decimal,
    pub max_notional: Decimal,
    pub default_leverage: u32,
    pub min_leverage: u32,
    pub max_leverage: u32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            default_notional: dec!(50),
            min_notional: dec!(20),
            max_notional: dec!(100),
            default_leverage: 5,
            min_leverage: 1,
            max_leverage: 20,
        }
    }
}

/// Polling cadence per state, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Idle / evaluation interval.
    pub idle_secs: u64,

    /// Interval while an order is being monitored.
    pub monitor_secs: u64,

    /// Delay after a transient failure.
    pub error_retry_secs: u64,

    /// Candles fetched per evaluation.
    pub candle_limit: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            idle_secs: 120,
            monitor_secs: 60,
            error_retry_secs: 60,
            candle_limit: 50,
        }
    }
}

/// Aggregate configuration for the trading core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradingConfig {
    pub risk: RiskConfig,
    pub stops: StopConfig,
    pub gate: GateConfig,
    pub cadence: CadenceConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_budget_steps_monotonically() {
        let config = RiskConfig::default();

        assert_eq!(config.risk_budget(dec!(0)), dec!(100));
        assert_eq!(config.risk_budget(dec!(9.9)), dec!(100));
        assert_eq!(config.risk_budget(dec!(15)), dec!(150));
        assert_eq!(config.risk_budget(dec!(30)), dec!(225));
        assert_eq!(config.risk_budget(dec!(80)), dec!(350));
    }

    #[test]
    fn test_risk_budget_boundary_takes_lower_tier() {
        let config = RiskConfig::default();

        // Exactly at a tier boundary stays conservative.
        assert_eq!(config.risk_budget(dec!(10)), dec!(100));
        assert_eq!(config.risk_budget(dec!(25)), dec!(150));
    }

    #[test]
    fn test_risk_budget_respects_ceiling() {
        let mut config = RiskConfig::default();
        config.drawdown_tiers.push(DrawdownTier {
            drawdown_pct: dec!(90),
            risk_usd: dec!(10000),
        });

        assert_eq!(config.risk_budget(dec!(95)), dec!(400));
    }
}
