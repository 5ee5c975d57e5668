//! Technical-indicator snapshot computed over recent candles.
//!
//! Indicator math runs in `f64` via the `ta` crate; prices stay `Decimal`
//! everywhere money is involved.

use anyhow::anyhow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use ta::indicators::{
    AverageTrueRange, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex,
};
use ta::Next;

use crate::error::CycleError;
use crate::models::Candle;

/// Minimum candles needed for a meaningful snapshot (longest lookback is the
/// MACD slow EMA).
const MIN_CANDLES: usize = 26;

/// Short-term trend classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Up => write!(f, "up"),
            Trend::Down => write!(f, "down"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

/// Current market state as fed to the advisory service.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Close of the most recent candle.
    pub price: Decimal,
    pub rsi: f64,
    pub ema20: f64,
    pub ema50: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_histogram: f64,
    pub atr: f64,
    /// ATR as a percentage of price.
    pub volatility_pct: f64,
    /// Percent change over the last five candles.
    pub change_5m_pct: f64,
    pub volume_rising: bool,
    pub trend: Trend,
    /// Heuristic signal confidence, 0-100.
    pub confidence: i32,
}

impl MarketSnapshot {
    /// Compute the snapshot from candles sorted oldest-first.
    pub fn from_candles(candles: &[Candle]) -> Result<Self, CycleError> {
        if candles.len() < MIN_CANDLES {
            return Err(CycleError::DataUnavailable(format!(
                "need at least {MIN_CANDLES} candles, got {}",
                candles.len()
            )));
        }

        let closes: Vec<f64> = candles
            .iter()
            .map(|c| {
                c.close
                    .to_f64()
                    .ok_or_else(|| CycleError::DataUnavailable("close out of f64 range".into()))
            })
            .collect::<Result<_, _>>()?;
        let volumes: Vec<f64> = candles
            .iter()
            .map(|c| c.volume.to_f64().unwrap_or(0.0))
            .collect();

        let mut rsi_ind = RelativeStrengthIndex::new(14)
            .map_err(|e| CycleError::Other(anyhow!("failed to initialize RSI: {e:?}")))?;
        let mut ema20_ind = ExponentialMovingAverage::new(20)
            .map_err(|e| CycleError::Other(anyhow!("failed to initialize EMA20: {e:?}")))?;
        let mut ema50_ind = ExponentialMovingAverage::new(50)
            .map_err(|e| CycleError::Other(anyhow!("failed to initialize EMA50: {e:?}")))?;
        let mut macd_ind = MovingAverageConvergenceDivergence::new(12, 26, 9)
            .map_err(|e| CycleError::Other(anyhow!("failed to initialize MACD: {e:?}")))?;
        let mut atr_ind = AverageTrueRange::new(14)
            .map_err(|e| CycleError::Other(anyhow!("failed to initialize ATR: {e:?}")))?;

        let mut rsi = 50.0;
        let mut ema20 = 0.0;
        let mut ema50 = 0.0;
        let mut macd_out = (0.0, 0.0, 0.0);
        let mut atr = 0.0;

        for &close in &closes {
            rsi = rsi_ind.next(close);
            ema20 = ema20_ind.next(close);
            ema50 = ema50_ind.next(close);
            let m = macd_ind.next(close);
            macd_out = (m.macd, m.signal, m.histogram);
            atr = atr_ind.next(close);
        }

        let price_f64 = *closes.last().unwrap_or(&0.0);
        let price = candles[candles.len() - 1].close;

        let change_5m_pct = {
            let base = closes[closes.len() - 6];
            if base != 0.0 {
                (price_f64 - base) / base * 100.0
            } else {
                0.0
            }
        };

        let recent_volume = mean(&volumes[volumes.len() - 5..]);
        let volume_rising = *volumes.last().unwrap_or(&0.0) > recent_volume;

        let trend = if price_f64 > ema20 && ema20 > ema50 {
            Trend::Up
        } else if price_f64 < ema20 && ema20 < ema50 {
            Trend::Down
        } else {
            Trend::Sideways
        };

        let volatility_pct = if price_f64 != 0.0 {
            atr / price_f64 * 100.0
        } else {
            0.0
        };

        let confidence = confidence_score(rsi, trend, macd_out.0, macd_out.1, &volumes);

        Ok(MarketSnapshot {
            price,
            rsi,
            ema20,
            ema50,
            macd: macd_out.0,
            macd_signal: macd_out.1,
            macd_histogram: macd_out.2,
            atr,
            volatility_pct,
            change_5m_pct,
            volume_rising,
            trend,
            confidence,
        })
    }
}

/// Heuristic confluence score, 0-100: neutral RSI, a clear trend, a wide MACD
/// spread, and a volume pickup each add; extremes and chop subtract.
fn confidence_score(rsi: f64, trend: Trend, macd: f64, macd_signal: f64, volumes: &[f64]) -> i32 {
    let mut confidence = 50;

    if rsi > 30.0 && rsi < 70.0 {
        confidence += 10;
    } else if !(20.0..=80.0).contains(&rsi) {
        confidence -= 15;
    }

    match trend {
        Trend::Up | Trend::Down => confidence += 15,
        Trend::Sideways => confidence -= 10,
    }

    if (macd - macd_signal).abs() > 50.0 {
        confidence += 10;
    }

    if volumes.len() >= 3 {
        let recent = mean(&volumes[volumes.len() - 3..]);
        if recent > mean(volumes) * 1.2 {
            confidence += 5;
        }
    }

    confidence.clamp(0, 100)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ramp_candles(n: usize, start: f64, step: f64) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let close = start + step * i as f64;
                let c = Decimal::try_from(close).unwrap();
                Candle {
                    open_time: i as i64 * 60_000,
                    open: c,
                    high: c + dec!(5),
                    low: c - dec!(5),
                    close: c,
                    volume: dec!(10),
                }
            })
            .collect()
    }

    #[test]
    fn test_snapshot_requires_enough_candles() {
        let candles = ramp_candles(10, 60_000.0, 1.0);
        assert!(matches!(
            MarketSnapshot::from_candles(&candles),
            Err(CycleError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_rising_market_trends_up() {
        let candles = ramp_candles(60, 60_000.0, 25.0);
        let snap = MarketSnapshot::from_candles(&candles).unwrap();

        assert_eq!(snap.trend, Trend::Up);
        assert!(snap.change_5m_pct > 0.0);
        assert!(snap.rsi > 50.0 && snap.rsi <= 100.0);
        assert!((0..=100).contains(&snap.confidence));
    }

    #[test]
    fn test_falling_market_trends_down() {
        let candles = ramp_candles(60, 70_000.0, -25.0);
        let snap = MarketSnapshot::from_candles(&candles).unwrap();

        assert_eq!(snap.trend, Trend::Down);
        assert!(snap.change_5m_pct < 0.0);
        assert!(snap.rsi < 50.0);
    }

    #[test]
    fn test_flat_market_is_sideways_with_zero_volatility() {
        let candles = ramp_candles(60, 60_000.0, 0.0);
        let snap = MarketSnapshot::from_candles(&candles).unwrap();

        assert_eq!(snap.trend, Trend::Sideways);
        assert!(snap.atr.abs() < f64::EPSILON);
        assert!(snap.volatility_pct.abs() < f64::EPSILON);
    }
}
