//! Stop-loss / take-profit validation and repair.
//!
//! Total and idempotent: bad levels are corrected, never rejected, and
//! running the guard over its own output changes nothing. Every correction is
//! logged so operators can see how far the advisory levels drifted.

use rust_decimal::Decimal;
use tracing::warn;

use crate::models::{PriceLevels, Side};

use super::StopConfig;

/// Validates and repairs proposed trigger prices against the live price and
/// trade direction.
pub struct StopGuard {
    config: StopConfig,
}

impl StopGuard {
    pub fn new(config: StopConfig) -> Self {
        Self { config }
    }

    /// Finalize levels for submission. Applies, in order: wrong-side SL
    /// replacement, minimum SL distance, wrong-side TP replacement, and the
    /// reward:risk floor.
    pub fn finalize(
        &self,
        side: Side,
        current_price: Decimal,
        proposed_sl: Option<Decimal>,
        proposed_tp: Option<Decimal>,
    ) -> PriceLevels {
        let mut stop_loss = proposed_sl;
        let mut take_profit = proposed_tp;

        if let Some(sl) = stop_loss {
            let wrong_side = match side {
                Side::Long => sl >= current_price,
                Side::Short => sl <= current_price,
            };
            if wrong_side {
                let offset = current_price * self.config.fallback_sl_pct;
                let replaced = match side {
                    Side::Long => current_price - offset,
                    Side::Short => current_price + offset,
                };
                warn!(
                    side = side.position_side(),
                    proposed = %sl,
                    corrected = %replaced,
                    price = %current_price,
                    "stop-loss on wrong side of price; replaced"
                );
                stop_loss = Some(replaced);
            }
        }

        if let Some(sl) = stop_loss {
            let min_distance = current_price * self.config.min_sl_distance_pct;
            if (current_price - sl).abs() < min_distance {
                let pushed = match side {
                    Side::Long => current_price - min_distance,
                    Side::Short => current_price + min_distance,
                };
                warn!(
                    side = side.position_side(),
                    proposed = %sl,
                    corrected = %pushed,
                    "stop-loss too close to price; pushed to minimum distance"
                );
                stop_loss = Some(pushed);
            }
        }

        if let Some(tp) = take_profit {
            let wrong_side = match side {
                Side::Long => tp <= current_price,
                Side::Short => tp >= current_price,
            };
            if wrong_side {
                let offset = current_price * self.config.fallback_tp_pct;
                let replaced = match side {
                    Side::Long => current_price + offset,
                    Side::Short => current_price - offset,
                };
                warn!(
                    side = side.position_side(),
                    proposed = %tp,
                    corrected = %replaced,
                    price = %current_price,
                    "take-profit on wrong side of price; replaced"
                );
                take_profit = Some(replaced);
            }
        }

        if let (Some(sl), Some(tp)) = (stop_loss, take_profit) {
            let sl_distance = (current_price - sl).abs();
            let tp_distance = (tp - current_price).abs();
            let required = self.config.min_reward_risk * sl_distance;
            if tp_distance < required {
                let pushed = match side {
                    Side::Long => current_price + required,
                    // A short target cannot cross zero: on a very wide stop
                    // the push clamps to the closest allowed trigger and the
                    // ratio is best-effort.
                    Side::Short => (current_price - required)
                        .max(current_price * self.config.min_sl_distance_pct),
                };
                warn!(
                    side = side.position_side(),
                    proposed = %tp,
                    corrected = %pushed,
                    reward_risk = %self.config.min_reward_risk,
                    "take-profit below reward:risk floor; pushed outward"
                );
                take_profit = Some(pushed);
            }
        }

        PriceLevels {
            stop_loss,
            take_profit,
        }
    }
}
