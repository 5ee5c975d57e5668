//! Error taxonomy for one trading cycle.
//!
//! The variant decides the retry cadence: transport failures back off on the
//! short error interval, missing data retries on the normal evaluation
//! interval, and margin problems skip the trade without counting as a
//! failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CycleError {
    /// Network failure or an exchange/advisory rejection.
    #[error("transport error: {0}")]
    Transport(String),

    /// The upstream answered but the data needed for a decision is missing
    /// or unusable. Retried at the normal cadence.
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// Sizing refused the trade; not a failure of the cycle itself.
    #[error("insufficient margin: {0}")]
    MarginInsufficient(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for CycleError {
    fn from(err: reqwest::Error) -> Self {
        CycleError::Transport(err.to_string())
    }
}
