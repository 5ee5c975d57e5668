//! Exchange and advisory API clients.

mod advisor;
mod exchange;
mod types;

pub use advisor::{Advisor, GeminiClient};
pub use exchange::{BingxClient, Exchange, ExchangeConfig};
