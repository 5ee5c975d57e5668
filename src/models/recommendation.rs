//! Structured advisory recommendation parsed from free-form text.
//!
//! The advisory service is told to answer with fixed `Key: value` lines:
//!
//! ```text
//! Signal: [buy/sell/hold]
//! Amount: [notional in USD, empty if hold]
//! Leverage: [integer, empty if hold]
//! SL: [price or empty]
//! TP: [price or empty]
//! Reason: [short free text]
//! ```
//!
//! Parsing is total: anything that cannot be read degrades to `Hold` rather
//! than failing the cycle.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Recommended trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Buy,
    Sell,
    #[default]
    Hold,
}

/// Advisory output in structured form. The default is an empty hold.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Recommendation {
    pub direction: Direction,
    pub amount: Option<Decimal>,
    pub leverage: Option<u32>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reason: String,
}

impl Recommendation {
    /// Parse the advisory response text. Never fails; missing or garbled
    /// fields stay `None` and an absent signal line means `Hold`.
    pub fn parse(text: &str) -> Self {
        let mut rec = Recommendation {
            direction: Direction::Hold,
            amount: None,
            leverage: None,
            stop_loss: None,
            take_profit: None,
            reason: String::new(),
        };

        for raw_line in text.lines() {
            // Tolerate markdown decoration around the key.
            let line = raw_line.trim().trim_start_matches(['*', '-', '#', ' ']);
            let lower = line.to_lowercase();

            if let Some(rest) = lower.strip_prefix("signal:") {
                rec.direction = if rest.contains("buy") {
                    Direction::Buy
                } else if rest.contains("sell") {
                    Direction::Sell
                } else {
                    Direction::Hold
                };
            } else if let Some(rest) = lower.strip_prefix("amount:") {
                rec.amount = first_number(rest);
            } else if let Some(rest) = lower.strip_prefix("leverage:") {
                rec.leverage = first_number(rest).and_then(|d| d.trunc().to_u32());
            } else if let Some(rest) = lower.strip_prefix("sl:") {
                rec.stop_loss = first_number(rest);
            } else if let Some(rest) = lower.strip_prefix("tp:") {
                rec.take_profit = first_number(rest);
            } else if lower.starts_with("reason:") {
                // Preserve the original casing of the reason text.
                let idx = raw_line.to_lowercase().find("reason:").unwrap_or(0);
                rec.reason = raw_line[idx + "reason:".len()..].trim().to_string();
            }
        }

        rec
    }
}

/// Extract the first decimal number embedded in a line ("x10" -> 10,
/// " 59400.5 usd" -> 59400.5).
fn first_number(s: &str) -> Option<Decimal> {
    let mut start = None;
    let mut end = 0;

    for (i, c) in s.char_indices() {
        if c.is_ascii_digit() || (c == '.' && start.is_some()) {
            if start.is_none() {
                start = Some(i);
            }
            end = i + c.len_utf8();
        } else if start.is_some() {
            break;
        }
    }

    let slice = &s[start?..end];
    Decimal::from_str(slice.trim_end_matches('.')).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_full_response() {
        let text = "Signal: buy\n\
                    Amount: 60 USD\n\
                    Leverage: 8\n\
                    SL: 59400.5\n\
                    TP: 61200\n\
                    Reason: momentum breakout with rising volume";

        let rec = Recommendation::parse(text);
        assert_eq!(rec.direction, Direction::Buy);
        assert_eq!(rec.amount, Some(dec!(60)));
        assert_eq!(rec.leverage, Some(8));
        assert_eq!(rec.stop_loss, Some(dec!(59400.5)));
        assert_eq!(rec.take_profit, Some(dec!(61200)));
        assert_eq!(rec.reason, "momentum breakout with rising volume");
    }

    #[test]
    fn test_parse_hold_without_levels() {
        let rec = Recommendation::parse("Signal: hold\nReason: choppy range");
        assert_eq!(rec.direction, Direction::Hold);
        assert_eq!(rec.amount, None);
        assert_eq!(rec.stop_loss, None);
        assert_eq!(rec.reason, "choppy range");
    }

    #[test]
    fn test_parse_tolerates_markdown() {
        let rec = Recommendation::parse("**Signal:** sell\n* SL: 61000\n* TP: 58000");
        assert_eq!(rec.direction, Direction::Sell);
        assert_eq!(rec.stop_loss, Some(dec!(61000)));
        assert_eq!(rec.take_profit, Some(dec!(58000)));
    }

    #[test]
    fn test_parse_garbage_defaults_to_hold() {
        let rec = Recommendation::parse("the market will definitely moon");
        assert_eq!(rec.direction, Direction::Hold);
        assert!(rec.reason.is_empty());
    }

    #[test]
    fn test_parse_empty_text() {
        let rec = Recommendation::parse("");
        assert_eq!(rec.direction, Direction::Hold);
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number(" 42.5 usd"), Some(dec!(42.5)));
        assert_eq!(first_number("x10"), Some(dec!(10)));
        assert_eq!(first_number("none"), None);
    }
}
