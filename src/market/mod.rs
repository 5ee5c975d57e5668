//! Market-state analysis: indicator snapshot and the advisory prompt.

mod indicators;
mod prompt;

pub use indicators::{MarketSnapshot, Trend};
pub use prompt::advisory_prompt;
