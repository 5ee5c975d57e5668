//! Signed REST gateway to a BingX-style perpetual-futures exchange.
//!
//! Request signing: HMAC-SHA256 over the alphabetically sorted query string
//! with a millisecond timestamp appended last; the hex signature rides in the
//! URL and the API key in the `X-BX-APIKEY` header. The signature covers the
//! raw (unencoded) query string; values are percent-encoded for transmission.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::CycleError;
use crate::models::{AccountBalanceView, Candle, OrderHandle, OrderIntent, OrderStatus, Side, SymbolRules};

use super::types::*;

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://open-api.bingx.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Exchange connection settings, loaded from the environment.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
    /// Contract symbol, e.g. `BTC-USDT`.
    pub symbol: String,
    /// Candle interval, e.g. `1m`.
    pub interval: String,
}

impl ExchangeConfig {
    /// Read connection settings from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("BINGX_API_KEY")
            .map_err(|_| anyhow!("BINGX_API_KEY not set"))?;
        let api_secret = std::env::var("BINGX_API_SECRET")
            .map_err(|_| anyhow!("BINGX_API_SECRET not set"))?;
        let base_url = std::env::var("BINGX_API_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let symbol = std::env::var("SYMBOL").unwrap_or_else(|_| "BTC-USDT".to_string());
        let interval = std::env::var("TIMEFRAME").unwrap_or_else(|_| "1m".to_string());

        Ok(Self {
            api_key,
            api_secret,
            base_url,
            symbol,
            interval,
        })
    }
}

/// Logical exchange operations the state machine depends on.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Recent candles for the configured symbol/interval, oldest first.
    async fn klines(&self, limit: u32) -> Result<Vec<Candle>, CycleError>;

    /// Current mark/last price for the configured symbol.
    async fn mark_price(&self) -> Result<Decimal, CycleError>;

    /// Fresh margin snapshot of the futures account.
    async fn balance(&self) -> Result<AccountBalanceView, CycleError>;

    /// Set leverage for one position side (hedge mode).
    async fn set_leverage(&self, leverage: u32, side: Side) -> Result<(), CycleError>;

    /// Submit a market order with optional attached SL/TP triggers.
    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderHandle, CycleError>;

    /// Status of an order by id. Unknown ids report `OrderStatus::Unknown`
    /// rather than an error so monitoring can retire them.
    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, CycleError>;

    /// Orders still working on the exchange for the configured symbol.
    async fn open_orders(&self) -> Result<Vec<OrderHandle>, CycleError>;

    /// Whether any position with non-zero size is open for the symbol.
    async fn has_open_position(&self) -> Result<bool, CycleError>;

    /// Trading rules the exchange declares for the symbol.
    async fn symbol_rules(&self) -> Result<SymbolRules, CycleError>;
}

/// BingX perpetual-futures REST client.
pub struct BingxClient {
    http: Client,
    config: ExchangeConfig,
}

impl BingxClient {
    pub fn new(config: ExchangeConfig) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { http, config })
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    fn sign(&self, payload: &str) -> Result<String, CycleError> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.as_bytes())
            .map_err(|e| CycleError::Other(anyhow!("invalid secret key length: {e}")))?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn signed_envelope<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<ApiEnvelope<T>, CycleError> {
        let pairs = canonical_pairs(params, Utc::now().timestamp_millis());
        let signature = self.sign(&raw_query(&pairs))?;
        let url = format!(
            "{}{}?{}&signature={}",
            self.config.base_url,
            path,
            encoded_query(&pairs),
            signature
        );

        debug!(%path, "signed exchange request");

        let response = self
            .http
            .request(method, &url)
            .header("X-BX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CycleError::Transport(format!(
                "{path} failed: {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Signed request that treats a non-zero envelope code as a transport
    /// failure and a missing `data` field as unavailable data.
    async fn signed_data<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CycleError> {
        let envelope: ApiEnvelope<T> = self.signed_envelope(method, path, params).await?;
        if envelope.code != 0 {
            return Err(CycleError::Transport(format!(
                "{path} rejected: code {} - {}",
                envelope.code, envelope.msg
            )));
        }
        envelope
            .data
            .ok_or_else(|| CycleError::DataUnavailable(format!("{path} returned no data")))
    }

    async fn unsigned_data<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, CycleError> {
        let response = self
            .http
            .get(format!("{}{}", self.config.base_url, path))
            .query(params)
            .header("X-BX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CycleError::Transport(format!(
                "{path} failed: {status} - {body}"
            )));
        }

        let envelope: ApiEnvelope<T> = response.json().await?;
        if envelope.code != 0 {
            return Err(CycleError::Transport(format!(
                "{path} rejected: code {} - {}",
                envelope.code, envelope.msg
            )));
        }
        envelope
            .data
            .ok_or_else(|| CycleError::DataUnavailable(format!("{path} returned no data")))
    }
}

#[async_trait]
impl Exchange for BingxClient {
    async fn klines(&self, limit: u32) -> Result<Vec<Candle>, CycleError> {
        let params = [
            ("symbol", self.config.symbol.clone()),
            ("interval", self.config.interval.clone()),
            ("limit", limit.to_string()),
        ];
        let klines: Vec<KlineData> = self
            .signed_data(Method::GET, "/openApi/swap/v3/quote/klines", &params)
            .await?;

        if klines.is_empty() {
            return Err(CycleError::DataUnavailable("empty candle set".into()));
        }

        let mut candles = klines
            .iter()
            .map(|k| {
                Ok(Candle {
                    open_time: k.time,
                    open: parse_amount(&k.open, "kline open")?,
                    high: parse_amount(&k.high, "kline high")?,
                    low: parse_amount(&k.low, "kline low")?,
                    close: parse_amount(&k.close, "kline close")?,
                    volume: parse_amount(&k.volume, "kline volume")?,
                })
            })
            .collect::<Result<Vec<_>, CycleError>>()?;

        candles.sort_by_key(|c| c.open_time);
        Ok(candles)
    }

    async fn mark_price(&self) -> Result<Decimal, CycleError> {
        let params = [("symbol", self.config.symbol.clone())];
        let data: PriceData = self
            .unsigned_data("/openApi/swap/v2/quote/price", &params)
            .await?;
        parse_amount(&data.price, "price")
    }

    async fn balance(&self) -> Result<AccountBalanceView, CycleError> {
        let data: BalanceData = self
            .signed_data(Method::GET, "/openApi/swap/v2/user/balance", &[])
            .await?;
        let detail = data.balance;

        Ok(AccountBalanceView {
            available_margin: parse_required(detail.available_margin, "availableMargin")?,
            used_margin: parse_required(detail.used_margin, "usedMargin")?,
            wallet_balance: parse_required(detail.balance, "balance")?,
            margin_balance: parse_required(detail.equity, "equity")?,
        })
    }

    async fn set_leverage(&self, leverage: u32, side: Side) -> Result<(), CycleError> {
        let params = [
            ("leverage", leverage.to_string()),
            ("side", side.position_side().to_string()),
            ("symbol", self.config.symbol.clone()),
        ];
        let envelope: ApiEnvelope<serde_json::Value> = self
            .signed_envelope(Method::POST, "/openApi/swap/v2/trade/leverage", &params)
            .await?;

        if envelope.code != 0 {
            return Err(CycleError::Transport(format!(
                "leverage rejected: code {} - {}",
                envelope.code, envelope.msg
            )));
        }
        Ok(())
    }

    async fn place_order(&self, intent: &OrderIntent) -> Result<OrderHandle, CycleError> {
        let mut params = vec![
            ("symbol", self.config.symbol.clone()),
            ("side", intent.side.order_side().to_string()),
            ("positionSide", intent.side.position_side().to_string()),
            ("type", "MARKET".to_string()),
            ("quantity", intent.quantity.normalize().to_string()),
        ];

        if let Some(sl) = intent.levels.stop_loss {
            let trigger = json!({
                "type": "STOP_MARKET",
                "stopPrice": sl.to_f64(),
                "workingType": "MARK_PRICE",
            });
            params.push(("stopLoss", trigger.to_string()));
        }
        if let Some(tp) = intent.levels.take_profit {
            let trigger = json!({
                "type": "TAKE_PROFIT_MARKET",
                "stopPrice": tp.to_f64(),
                "price": tp.to_f64(),
                "workingType": "MARK_PRICE",
            });
            params.push(("takeProfit", trigger.to_string()));
        }

        let data: OrderData = self
            .signed_data(Method::POST, "/openApi/swap/v2/trade/order", &params)
            .await?;

        if data.order.order_id == 0 {
            return Err(CycleError::DataUnavailable(
                "order response missing order id".into(),
            ));
        }

        let status = if data.order.status.is_empty() {
            OrderStatus::New
        } else {
            OrderStatus::from_exchange(&data.order.status)
        };

        Ok(OrderHandle {
            order_id: data.order.order_id.to_string(),
            status,
        })
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus, CycleError> {
        let params = [
            ("orderId", order_id.to_string()),
            ("symbol", self.config.symbol.clone()),
        ];
        let envelope: ApiEnvelope<OrderData> = self
            .signed_envelope(Method::GET, "/openApi/swap/v2/trade/order", &params)
            .await?;

        // A rejection code on a status lookup means the exchange no longer
        // knows the order; monitoring treats that as terminal.
        if envelope.code != 0 {
            debug!(order_id, code = envelope.code, msg = %envelope.msg, "order lookup rejected");
            return Ok(OrderStatus::Unknown);
        }

        Ok(envelope
            .data
            .map(|d| OrderStatus::from_exchange(&d.order.status))
            .unwrap_or(OrderStatus::Unknown))
    }

    async fn open_orders(&self) -> Result<Vec<OrderHandle>, CycleError> {
        let params = [("symbol", self.config.symbol.clone())];
        let envelope: ApiEnvelope<OpenOrdersData> = self
            .signed_envelope(Method::GET, "/openApi/swap/v2/trade/openOrders", &params)
            .await?;

        if envelope.code != 0 {
            return Err(CycleError::Transport(format!(
                "openOrders rejected: code {} - {}",
                envelope.code, envelope.msg
            )));
        }

        Ok(envelope
            .data
            .unwrap_or_default()
            .orders
            .into_iter()
            .map(|o| OrderHandle {
                order_id: o.order_id.to_string(),
                status: OrderStatus::from_exchange(&o.status),
            })
            .filter(|h| h.status.is_open())
            .collect())
    }

    async fn has_open_position(&self) -> Result<bool, CycleError> {
        let params = [("symbol", self.config.symbol.clone())];
        let envelope: ApiEnvelope<Vec<PositionData>> = self
            .signed_envelope(Method::GET, "/openApi/swap/v2/user/positions", &params)
            .await?;

        if envelope.code != 0 {
            return Err(CycleError::Transport(format!(
                "positions rejected: code {} - {}",
                envelope.code, envelope.msg
            )));
        }

        Ok(envelope
            .data
            .unwrap_or_default()
            .iter()
            .any(|p| f64::from_str(&p.position_amt).map(|a| a != 0.0).unwrap_or(false)))
    }

    async fn symbol_rules(&self) -> Result<SymbolRules, CycleError> {
        let contracts: Vec<ContractData> = self
            .unsigned_data("/openApi/swap/v2/quote/contracts", &[])
            .await?;

        let contract = contracts
            .iter()
            .find(|c| c.symbol == self.config.symbol)
            .ok_or_else(|| {
                CycleError::DataUnavailable(format!(
                    "no contract rules for {}",
                    self.config.symbol
                ))
            })?;

        Ok(SymbolRules {
            min_quantity: Decimal::try_from(contract.trade_min_quantity)
                .map_err(|e| CycleError::DataUnavailable(format!("bad min quantity: {e}")))?,
            min_notional: Decimal::try_from(contract.trade_min_usdt)
                .map_err(|e| CycleError::DataUnavailable(format!("bad min notional: {e}")))?,
            tick_size: Decimal::new(1, contract.price_precision),
            step_size: Decimal::new(1, contract.quantity_precision),
            quantity_precision: contract.quantity_precision,
        })
    }
}

/// Sorted query pairs with the timestamp appended last, matching what the
/// exchange verifies against.
fn canonical_pairs(params: &[(&str, String)], timestamp_ms: i64) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    pairs.push(("timestamp".to_string(), timestamp_ms.to_string()));
    pairs
}

fn raw_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn encoded_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_amount(value: &str, field: &str) -> Result<Decimal, CycleError> {
    Decimal::from_str(value)
        .map_err(|_| CycleError::DataUnavailable(format!("unparseable {field}: {value:?}")))
}

fn parse_required(value: Option<String>, field: &str) -> Result<Decimal, CycleError> {
    let value =
        value.ok_or_else(|| CycleError::DataUnavailable(format!("missing balance field {field}")))?;
    parse_amount(&value, field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pairs_sorted_with_trailing_timestamp() {
        let params = [
            ("symbol", "BTC-USDT".to_string()),
            ("side", "BUY".to_string()),
            ("quantity", "0.001".to_string()),
        ];
        let pairs = canonical_pairs(&params, 1_700_000_000_000);

        assert_eq!(
            raw_query(&pairs),
            "quantity=0.001&side=BUY&symbol=BTC-USDT&timestamp=1700000000000"
        );
    }

    #[test]
    fn test_encoded_query_escapes_trigger_json() {
        let pairs = canonical_pairs(
            &[("stopLoss", r#"{"type":"STOP_MARKET"}"#.to_string())],
            1,
        );
        let encoded = encoded_query(&pairs);

        assert!(!encoded.contains('{'));
        assert!(!encoded.contains('"'));
        assert!(encoded.starts_with("stopLoss=%7B"));
    }

    #[test]
    fn test_signature_is_deterministic_hex() {
        let client = BingxClient::new(ExchangeConfig {
            api_key: "key".into(),
            api_secret: "secret".into(),
            base_url: DEFAULT_BASE_URL.into(),
            symbol: "BTC-USDT".into(),
            interval: "1m".into(),
        })
        .unwrap();

        let a = client.sign("symbol=BTC-USDT&timestamp=1").unwrap();
        let b = client.sign("symbol=BTC-USDT&timestamp=1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert!(parse_amount("60123.5", "price").is_ok());
        assert!(matches!(
            parse_amount("n/a", "price"),
            Err(CycleError::DataUnavailable(_))
        ));
    }
}
