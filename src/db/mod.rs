//! SQLite persistence: the active-order session and the order audit log.
//!
//! Only the active order id is required to survive a restart; the exchange is
//! the source of truth for everything else. The order log exists for the
//! `status` command and post-mortems.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

/// Durable store for the single-order session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Active order id, if a session survived the last shutdown.
    async fn load(&self) -> Result<Option<String>>;

    /// Persist the active order id.
    async fn save(&self, order_id: &str) -> Result<()>;

    /// Forget the active order.
    async fn clear(&self) -> Result<()>;

    /// Append a placed order to the audit log. Best-effort; default no-op.
    async fn record_order(&self, _record: &OrderRecord) -> Result<()> {
        Ok(())
    }
}

/// One placed order, as appended to the audit log.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub leverage: u32,
    pub margin: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reason: String,
}

/// Stored audit-log row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredOrder {
    pub id: String,
    pub order_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: String,
    pub price: String,
    pub leverage: i64,
    pub margin: String,
    pub stop_loss: Option<String>,
    pub take_profit: Option<String>,
    pub reason: String,
    pub created_at: String,
}

/// Database connection pool.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        // A single connection keeps `sqlite::memory:` databases coherent and
        // is plenty for one writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        // Single-row session table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trading_session (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                order_id TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Order audit log
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS order_log (
                id TEXT PRIMARY KEY,
                order_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity TEXT NOT NULL,
                price TEXT NOT NULL,
                leverage INTEGER NOT NULL,
                margin TEXT NOT NULL,
                stop_loss TEXT,
                take_profit TEXT,
                reason TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_order_log_time ON order_log(created_at)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Most recent audit-log rows, newest first.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<StoredOrder>> {
        sqlx::query_as::<_, StoredOrder>(
            "SELECT * FROM order_log ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch order log")
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn load(&self) -> Result<Option<String>> {
        let row: Option<(Option<String>,)> =
            sqlx::query_as("SELECT order_id FROM trading_session WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(order_id,)| order_id))
    }

    async fn save(&self, order_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trading_session (id, order_id, updated_at)
            VALUES (1, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                order_id = excluded.order_id,
                updated_at = datetime('now')
            "#,
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trading_session (id, order_id, updated_at)
            VALUES (1, NULL, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                order_id = NULL,
                updated_at = datetime('now')
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_order(&self, record: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO order_log (
                id, order_id, symbol, side, quantity, price,
                leverage, margin, stop_loss, take_profit, reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&record.order_id)
        .bind(&record.symbol)
        .bind(&record.side)
        .bind(record.quantity.to_string())
        .bind(record.price.to_string())
        .bind(record.leverage as i64)
        .bind(record.margin.to_string())
        .bind(record.stop_loss.map(|d| d.to_string()))
        .bind(record.take_profit.map(|d| d.to_string()))
        .bind(&record.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
