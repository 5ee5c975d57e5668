//! Trading core: risk configuration, position sizing, stop handling, and the
//! recommendation gate.

mod config;
mod gate;
mod sizer;
mod stop_guard;

pub use config::{DrawdownTier, GateConfig, RiskConfig, StopConfig, TradingConfig};
pub use gate::{Action, RecommendationGate};
pub use sizer::{PositionSizer, SizingRequest};
pub use stop_guard::StopGuard;
