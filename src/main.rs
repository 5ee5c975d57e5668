//! Perpetual-futures trading bot
//!
//! Runs one AI-advised position at a time on a BingX-style perpetual
//! exchange, with risk-managed sizing and repaired stop levels.

mod api;
mod bot;
mod db;
mod error;
mod market;
mod models;
mod trading;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::{BingxClient, ExchangeConfig, GeminiClient};
use crate::bot::Bot;
use crate::db::Database;
use crate::trading::TradingConfig;

/// Perpetual-futures trading bot CLI.
#[derive(Parser)]
#[command(name = "perppilot")]
#[command(about = "AI-advised single-position perpetual futures bot", long_about = None)]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "sqlite:./perppilot.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the trading loop
    Run {
        /// Idle polling interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Dry run (evaluate and size but never place orders)
        #[arg(long)]
        dry_run: bool,
    },

    /// Show current configuration
    Config,

    /// Show session state and recent orders
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { interval, dry_run } => {
            let exchange_config = ExchangeConfig::from_env()?;
            let symbol = exchange_config.symbol.clone();
            let exchange = BingxClient::new(exchange_config)?;
            let advisor = GeminiClient::from_env()?;
            let db = Database::new(&cli.database).await?;

            let mut config = trading_config_from_env()?;
            if let Some(secs) = interval {
                config.cadence.idle_secs = secs;
            }

            info!(
                symbol = %symbol,
                interval = config.cadence.idle_secs,
                dry_run,
                "Starting trading bot"
            );

            let mut bot = Bot::new(exchange, advisor, db, config.clone(), symbol.clone(), dry_run);
            bot.initialize().await?;

            println!("\n=== Perpetual Futures Bot ===");
            println!("Symbol:           {}", symbol);
            println!("Idle interval:    {}s", config.cadence.idle_secs);
            println!(
                "Mode:             {}",
                if dry_run { "DRY RUN (no real orders)" } else { "LIVE TRADING" }
            );
            println!("\nPress Ctrl+C to stop.\n");

            if let Err(e) = bot.run().await {
                tracing::error!(error = %e, "Bot error");
            }
        }

        Commands::Config => {
            let config = trading_config_from_env()?;

            println!("\n=== Risk Configuration ===\n");
            println!("  Safety Buffer:        ${}", config.risk.safety_buffer);
            println!("  Margin Utilization:   {}", config.risk.utilization);
            println!("  Min Available Margin: ${}", config.risk.min_available_margin);
            println!("  Base Risk Budget:     ${}", config.risk.base_risk_usd);
            println!("  Risk Ceiling:         ${}", config.risk.risk_ceiling_usd);
            println!("  Reference Balance:    ${}", config.risk.reference_balance);
            for tier in &config.risk.drawdown_tiers {
                println!(
                    "  Drawdown > {:>3}%:      ${}",
                    tier.drawdown_pct, tier.risk_usd
                );
            }

            println!("\n=== Stop Configuration ===\n");
            println!("  Fallback SL:          {}%", config.stops.fallback_sl_pct * Decimal::from(100));
            println!("  Fallback TP:          {}%", config.stops.fallback_tp_pct * Decimal::from(100));
            println!("  Min SL Distance:      {}%", config.stops.min_sl_distance_pct * Decimal::from(100));
            println!("  Min Reward:Risk:      {}", config.stops.min_reward_risk);

            println!("\n=== Recommendation Bounds ===\n");
            println!("  Default Notional:     ${}", config.gate.default_notional);
            println!("  Notional Range:       ${} - ${}", config.gate.min_notional, config.gate.max_notional);
            println!("  Default Leverage:     {}x", config.gate.default_leverage);
            println!("  Leverage Range:       {}x - {}x", config.gate.min_leverage, config.gate.max_leverage);

            println!("\n=== Cadence ===\n");
            println!("  Idle Interval:        {}s", config.cadence.idle_secs);
            println!("  Monitor Interval:     {}s", config.cadence.monitor_secs);
            println!("  Error Retry:          {}s", config.cadence.error_retry_secs);
            println!("  Candle Limit:         {}", config.cadence.candle_limit);
        }

        Commands::Status => {
            let db = Database::new(&cli.database).await?;

            use crate::db::SessionStore;
            println!("\n=== Session ===");
            match db.load().await? {
                Some(order_id) => println!("Active order:     {}", order_id),
                None => println!("Active order:     none"),
            }

            let orders = db.recent_orders(10).await?;
            if orders.is_empty() {
                println!("\nNo orders recorded yet.");
            } else {
                println!("\n=== Recent Orders ===");
                for o in &orders {
                    println!(
                        "  {} {} {} {} @ {} ({}x, margin ${})  SL {}  TP {}",
                        o.created_at,
                        o.side,
                        o.quantity,
                        o.symbol,
                        o.price,
                        o.leverage,
                        o.margin,
                        o.stop_loss.as_deref().unwrap_or("-"),
                        o.take_profit.as_deref().unwrap_or("-"),
                    );
                }
            }
        }
    }

    Ok(())
}

/// Trading configuration with recommendation bounds optionally pinned from
/// the environment.
fn trading_config_from_env() -> Result<TradingConfig> {
    let mut config = TradingConfig::default();

    if let Ok(amount) = std::env::var("TRADE_AMOUNT") {
        let amount = Decimal::from_str(&amount)?;
        config.gate.default_notional = amount;
    }
    if let Ok(leverage) = std::env::var("LEVERAGE") {
        config.gate.default_leverage = leverage.parse()?;
    }

    Ok(config)
}
