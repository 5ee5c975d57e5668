//! Prompt construction for the advisory service.
//!
//! The response-format block is a contract with `Recommendation::parse`; the
//! market summary around it is informational and free to evolve.

use std::fmt::Write;

use crate::market::MarketSnapshot;
use crate::models::AccountBalanceView;
use crate::trading::GateConfig;

/// Render the advisory prompt for one evaluation cycle.
pub fn advisory_prompt(
    symbol: &str,
    snapshot: &MarketSnapshot,
    balance: &AccountBalanceView,
    gate: &GateConfig,
) -> String {
    let mut p = String::with_capacity(1024);

    let _ = writeln!(
        p,
        "You are a disciplined crypto perpetual-futures trader. Analyze {symbol} and decide on exactly one action."
    );
    let _ = writeln!(p);
    let _ = writeln!(p, "Market:");
    let _ = writeln!(p, "- Price: {}", snapshot.price);
    let _ = writeln!(
        p,
        "- 5-candle change: {:+.2}% | trend: {}",
        snapshot.change_5m_pct, snapshot.trend
    );
    let _ = writeln!(p, "- RSI(14): {:.1}", snapshot.rsi);
    let _ = writeln!(
        p,
        "- EMA20: {:.2} | EMA50: {:.2}",
        snapshot.ema20, snapshot.ema50
    );
    let _ = writeln!(
        p,
        "- MACD: {:.2} | signal: {:.2} | histogram: {:.2}",
        snapshot.macd, snapshot.macd_signal, snapshot.macd_histogram
    );
    let _ = writeln!(
        p,
        "- ATR(14): {:.2} ({:.2}% of price) | volume {}",
        snapshot.atr,
        snapshot.volatility_pct,
        if snapshot.volume_rising {
            "rising"
        } else {
            "flat or falling"
        }
    );
    let _ = writeln!(p, "- Signal confidence: {}/100", snapshot.confidence);
    let _ = writeln!(p);
    let _ = writeln!(
        p,
        "Account: available margin {} USDT, wallet balance {} USDT.",
        balance.available_margin, balance.wallet_balance
    );
    let _ = writeln!(p);
    let _ = writeln!(
        p,
        "Position size must be between {} and {} USDT of margin; leverage between {}x and {}x.",
        gate.min_notional, gate.max_notional, gate.min_leverage, gate.max_leverage
    );

    // ATR-anchored level hints so the model proposes stops the market can
    // actually reach.
    if snapshot.atr > 0.0 {
        let _ = writeln!(
            p,
            "Suggested stop distance is about {:.2} (1.5x ATR) and profit target about {:.2} (3x ATR) from entry.",
            snapshot.atr * 1.5,
            snapshot.atr * 3.0
        );
    }

    let sizing_hint = if snapshot.confidence >= 70 {
        "Confidence is high; a size near the upper bound is acceptable."
    } else if snapshot.confidence >= 50 {
        "Confidence is moderate; prefer a mid-range size."
    } else {
        "Confidence is low; prefer hold, or the minimum size."
    };
    let _ = writeln!(p, "{sizing_hint}");

    let _ = writeln!(p);
    let _ = writeln!(p, "Respond with exactly these lines and nothing else:");
    let _ = writeln!(p, "Signal: [buy/sell/hold]");
    let _ = writeln!(p, "Amount: [margin in USDT, empty if hold]");
    let _ = writeln!(p, "Leverage: [integer, empty if hold]");
    let _ = writeln!(p, "SL: [stop-loss price, empty if hold]");
    let _ = writeln!(p, "TP: [take-profit price, empty if hold]");
    let _ = writeln!(p, "Reason: [one short sentence]");

    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Trend;
    use rust_decimal_macros::dec;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            price: dec!(60000),
            rsi: 55.0,
            ema20: 59_900.0,
            ema50: 59_500.0,
            macd: 120.0,
            macd_signal: 80.0,
            macd_histogram: 40.0,
            atr: 150.0,
            volatility_pct: 0.25,
            change_5m_pct: 0.4,
            volume_rising: true,
            trend: Trend::Up,
            confidence: 75,
        }
    }

    fn balance() -> AccountBalanceView {
        AccountBalanceView {
            available_margin: dec!(500),
            used_margin: dec!(0),
            wallet_balance: dec!(500),
            margin_balance: dec!(500),
        }
    }

    #[test]
    fn test_prompt_contains_the_response_contract() {
        let p = advisory_prompt("BTC-USDT", &snapshot(), &balance(), &GateConfig::default());

        for key in ["Signal:", "Amount:", "Leverage:", "SL:", "TP:", "Reason:"] {
            assert!(p.contains(key), "missing `{key}` in prompt");
        }
    }

    #[test]
    fn test_prompt_reflects_market_and_bounds() {
        let p = advisory_prompt("BTC-USDT", &snapshot(), &balance(), &GateConfig::default());

        assert!(p.contains("BTC-USDT"));
        assert!(p.contains("Price: 60000"));
        assert!(p.contains("between 20 and 100 USDT"));
        assert!(p.contains("between 1x and 20x"));
        assert!(p.contains("upper bound"));
    }

    #[test]
    fn test_zero_atr_omits_level_hints() {
        let mut snap = snapshot();
        snap.atr = 0.0;
        let p = advisory_prompt("BTC-USDT", &snap, &balance(), &GateConfig::default());

        assert!(!p.contains("1.5x ATR"));
    }
}
