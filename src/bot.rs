//! Bot runner: the single-position trading loop.
//!
//! One position at a time, driven by polling. Each tick either monitors the
//! active order, or runs a full evaluation: market snapshot, advisory call,
//! gate, stop repair, sizing, placement. The exchange is the source of truth
//! for order and position state; local session state is only a pointer to the
//! order being watched.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::api::{Advisor, Exchange};
use crate::db::{OrderRecord, SessionStore};
use crate::error::CycleError;
use crate::market::{advisory_prompt, MarketSnapshot};
use crate::models::{OrderIntent, SymbolRules};
use crate::trading::{
    Action, PositionSizer, RecommendationGate, SizingRequest, StopGuard, TradingConfig,
};

/// Where the loop currently is. Derived from the session pointer and the last
/// tick's outcome; exposed for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Idle,
    Evaluating,
    OrderPlaced,
    Monitoring,
}

/// Main bot runner, generic over its collaborators so the loop can be tested
/// against mocks.
pub struct Bot<E, A, S> {
    exchange: E,
    advisor: A,
    store: S,
    config: TradingConfig,
    symbol: String,
    dry_run: bool,

    state: BotState,
    /// Order id being monitored, if any.
    session: Option<String>,
    /// Contract rules, fetched once and cached for the process lifetime.
    rules: Option<SymbolRules>,

    shutdown: Arc<AtomicBool>,
}

impl<E, A, S> Bot<E, A, S>
where
    E: Exchange,
    A: Advisor,
    S: SessionStore,
{
    pub fn new(
        exchange: E,
        advisor: A,
        store: S,
        config: TradingConfig,
        symbol: String,
        dry_run: bool,
    ) -> Self {
        Self {
            exchange,
            advisor,
            store,
            config,
            symbol,
            dry_run,
            state: BotState::Idle,
            session: None,
            rules: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Restore the persisted session, if one survived the last shutdown.
    pub async fn initialize(&mut self) -> Result<()> {
        self.session = self
            .store
            .load()
            .await
            .context("Failed to load persisted session")?;

        if let Some(order_id) = &self.session {
            info!(order_id, "resuming persisted session");
            self.state = BotState::Monitoring;
        }
        Ok(())
    }

    /// Main run loop. Sleeps between ticks for the duration the tick asks
    /// for; failures log and back off without crashing the loop.
    pub async fn run(&mut self) -> Result<()> {
        info!(symbol = %self.symbol, dry_run = self.dry_run, "starting trading loop");

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown requested");
            shutdown.store(true, Ordering::SeqCst);
        });

        while !self.shutdown.load(Ordering::SeqCst) {
            let delay = match self.tick().await {
                Ok(delay) => delay,
                Err(e) => {
                    error!(error = %e, "cycle failed");
                    self.retry_delay(&e)
                }
            };
            sleep(delay).await;
        }

        info!("trading loop stopped");
        Ok(())
    }

    /// One cycle of the state machine. Returns how long to sleep before the
    /// next tick.
    pub async fn tick(&mut self) -> Result<Duration, CycleError> {
        if let Some(order_id) = self.session.clone() {
            return self.monitor(&order_id).await;
        }

        // Defensive check: anything already working on the exchange wins over
        // local state, even after a lost database.
        let open_orders = self.exchange.open_orders().await?;
        if !open_orders.is_empty() {
            info!(count = open_orders.len(), "open orders on exchange; standing by");
            self.state = BotState::Idle;
            return Ok(self.idle_delay());
        }
        if self.exchange.has_open_position().await? {
            info!("open position on exchange; standing by");
            self.state = BotState::Idle;
            return Ok(self.idle_delay());
        }

        self.evaluate().await
    }

    async fn monitor(&mut self, order_id: &str) -> Result<Duration, CycleError> {
        self.state = BotState::Monitoring;
        let status = self.exchange.order_status(order_id).await?;

        if status.is_open() {
            info!(order_id, ?status, "order still working");
            return Ok(Duration::from_secs(self.config.cadence.monitor_secs));
        }

        info!(order_id, ?status, "order resolved; session closed");
        if let Err(e) = self.store.clear().await {
            error!(error = %e, "failed to clear persisted session");
        }
        self.session = None;
        self.state = BotState::Idle;
        Ok(self.idle_delay())
    }

    async fn evaluate(&mut self) -> Result<Duration, CycleError> {
        self.state = BotState::Evaluating;

        let balance = self.exchange.balance().await?;
        let candles = self
            .exchange
            .klines(self.config.cadence.candle_limit)
            .await?;
        let snapshot = MarketSnapshot::from_candles(&candles)?;

        let prompt = advisory_prompt(&self.symbol, &snapshot, &balance, &self.config.gate);
        let recommendation = self.advisor.advise(&prompt).await?;
        info!(
            direction = ?recommendation.direction,
            reason = %recommendation.reason,
            confidence = snapshot.confidence,
            "advisory received"
        );

        let gate = RecommendationGate::new(self.config.gate.clone());
        let (side, notional, leverage, proposed) = match gate.decide(&recommendation) {
            Action::Hold { reason } => {
                info!(%reason, "holding");
                self.state = BotState::Idle;
                return Ok(self.idle_delay());
            }
            Action::Execute {
                side,
                notional,
                leverage,
                levels,
            } => (side, notional, leverage, levels),
        };

        // Refresh the price right before sizing; candles can be a minute old.
        let price = self.exchange.mark_price().await?;

        let guard = StopGuard::new(self.config.stops.clone());
        let levels = guard.finalize(side, price, proposed.stop_loss, proposed.take_profit);

        let rules = match &self.rules {
            Some(rules) => rules.clone(),
            None => {
                let rules = self.exchange.symbol_rules().await?;
                self.rules = Some(rules.clone());
                rules
            }
        };

        let sizer = PositionSizer::new(self.config.risk.clone(), rules);
        let sizing = sizer.size(&SizingRequest {
            requested_notional: notional,
            current_price: price,
            leverage,
            stop_loss: levels.stop_loss,
            balance: &balance,
        });

        if sizing.is_rejected() {
            let skip = CycleError::MarginInsufficient(format!(
                "available {} below sizing limits for notional {notional} at {leverage}x",
                balance.available_margin
            ));
            warn!(error = %skip, "trade skipped");
            self.state = BotState::Idle;
            return Ok(self.idle_delay());
        }

        if let Err(e) = self.exchange.set_leverage(leverage, side).await {
            // Leverage may already be set from a previous run.
            warn!(error = %e, leverage, "failed to set leverage; continuing");
        }

        let intent = OrderIntent {
            side,
            quantity: sizing.quantity,
            levels,
        };

        if self.dry_run {
            info!(
                side = side.position_side(),
                quantity = %intent.quantity,
                margin = %sizing.margin_committed,
                sl = ?levels.stop_loss,
                tp = ?levels.take_profit,
                "dry run: order not sent"
            );
            self.state = BotState::Idle;
            return Ok(self.idle_delay());
        }

        let handle = self.exchange.place_order(&intent).await?;
        self.state = BotState::OrderPlaced;
        info!(
            order_id = %handle.order_id,
            side = side.position_side(),
            quantity = %intent.quantity,
            margin = %sizing.margin_committed,
            "order placed"
        );

        if let Err(e) = self.store.save(&handle.order_id).await {
            // Keep trading on the in-memory session; persistence catches up
            // on the next save.
            error!(error = %e, "failed to persist session");
        }
        if let Err(e) = self
            .store
            .record_order(&OrderRecord {
                order_id: handle.order_id.clone(),
                symbol: self.symbol.clone(),
                side: side.order_side().to_string(),
                quantity: sizing.quantity,
                price,
                leverage,
                margin: sizing.margin_committed,
                stop_loss: levels.stop_loss,
                take_profit: levels.take_profit,
                reason: recommendation.reason.clone(),
            })
            .await
        {
            error!(error = %e, "failed to record order");
        }

        self.session = Some(handle.order_id);
        self.state = BotState::Monitoring;
        Ok(Duration::from_secs(self.config.cadence.monitor_secs))
    }

    fn idle_delay(&self) -> Duration {
        Duration::from_secs(self.config.cadence.idle_secs)
    }

    /// Back-off for a failed tick, by error class.
    fn retry_delay(&self, error: &CycleError) -> Duration {
        match error {
            // Missing data usually means a thin or lagging feed; the normal
            // cadence is the right retry.
            CycleError::DataUnavailable(_) | CycleError::MarginInsufficient(_) => {
                self.idle_delay()
            }
            CycleError::Transport(_) | CycleError::Other(_) => {
                Duration::from_secs(self.config.cadence.error_retry_secs)
            }
        }
    }
}
