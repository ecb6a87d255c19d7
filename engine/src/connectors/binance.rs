// Binance spot REST connector. Public market data needs no keys; the trading
// half signs every request with HMAC-SHA256 over the query string.
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};
use sha2::Sha256;
use shared::models::{Balances, Candle, Interval, OrderSide, Ticker};
use std::time::Duration;

use super::{MarketData, OrderId, Trading};
use crate::config::{ExchangeCredentials, ExchangeSettings};
use crate::error::{EngineError, Result};

type HmacSha256 = Hmac<Sha256>;

const CANCEL_PAUSE: Duration = Duration::from_millis(100);

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    symbol: String,
    #[serde_as(as = "DisplayFromStr")]
    last_price: f64,
    #[serde_as(as = "DisplayFromStr")]
    quote_volume: f64,
    #[serde_as(as = "DisplayFromStr")]
    price_change_percent: f64,
    #[serde(default)]
    count: u64,
}

impl From<RawTicker> for Ticker {
    fn from(raw: RawTicker) -> Self {
        Ticker {
            symbol: raw.symbol,
            last_price: raw.last_price,
            quote_volume: raw.quote_volume,
            price_change_percent: raw.price_change_percent,
            trade_count: raw.count,
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawPrice {
    #[serde_as(as = "DisplayFromStr")]
    price: f64,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    #[serde_as(as = "DisplayFromStr")]
    free: f64,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderAck {
    order_id: u64,
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| EngineError::ParseError(format!("Invalid timestamp {}", ms)))
}

fn kline_number(row: &[Value], idx: usize) -> Result<f64> {
    match row.get(idx) {
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map_err(|e| EngineError::ParseError(format!("kline field {} '{}': {}", idx, s, e))),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| EngineError::ParseError(format!("kline field {} out of range", idx))),
        _ => Err(EngineError::ParseError(format!("kline field {} missing", idx))),
    }
}

fn kline_time(row: &[Value], idx: usize) -> Result<DateTime<Utc>> {
    let ms = row
        .get(idx)
        .and_then(Value::as_i64)
        .ok_or_else(|| EngineError::ParseError(format!("kline time field {} missing", idx)))?;
    millis_to_utc(ms)
}

/// Klines arrive as `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`.
fn parse_kline(row: &[Value]) -> Result<Candle> {
    Ok(Candle {
        open_time: kline_time(row, 0)?,
        open: kline_number(row, 1)?,
        high: kline_number(row, 2)?,
        low: kline_number(row, 3)?,
        close: kline_number(row, 4)?,
        volume: kline_number(row, 5)?,
        close_time: kline_time(row, 6)?,
    })
}

/// Significant digits kept when rendering order prices and quantities.
const SIGNIFICANT_DIGITS: i32 = 12;

/// Plain decimal without exponent or trailing zeros, as the order endpoint expects.
/// The number of decimals follows the value's magnitude, so sub-micro prices
/// keep their significant digits.
pub fn format_decimal(value: f64) -> String {
    let decimals = if value == 0.0 || !value.is_finite() {
        0
    } else {
        let magnitude = value.abs().log10().floor() as i32;
        (SIGNIFICANT_DIGITS - 1 - magnitude).clamp(0, 30) as usize
    };
    let fixed = format!("{:.*}", decimals, value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn sign(secret: &str, payload: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| EngineError::ConfigError(format!("Invalid secret key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn build_client(settings: &ExchangeSettings) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?)
}

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{}{}", base_url.trim_end_matches('/'), path))
        .map_err(|e| EngineError::ConfigError(format!("Invalid exchange URL '{}': {}", base_url, e)))
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;
    if status != StatusCode::OK {
        return Err(EngineError::ExchangeError { status: status.as_u16(), body });
    }
    Ok(serde_json::from_str(&body)?)
}

/// Unauthenticated market data.
#[derive(Clone)]
pub struct BinancePublic {
    http_client: reqwest::Client,
    base_url: String,
}

impl BinancePublic {
    pub fn new(settings: &ExchangeSettings) -> Result<Self> {
        Ok(BinancePublic { http_client: build_client(settings)?, base_url: settings.base_url.clone() })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let mut url = endpoint(&self.base_url, path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let response = self.http_client.get(url).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl MarketData for BinancePublic {
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        // One unparseable row should not sink the whole scan.
        let rows: Vec<Value> = self.get("/api/v3/ticker/24hr", &[]).await?;
        let total = rows.len();
        let tickers: Vec<Ticker> = rows
            .into_iter()
            .filter_map(|row| serde_json::from_value::<RawTicker>(row).ok().map(Ticker::from))
            .collect();
        tracing::debug!(total, parsed = tickers.len(), "Fetched 24h tickers");
        Ok(tickers)
    }

    async fn fetch_candles(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Candle>> {
        let rows: Vec<Vec<Value>> = self
            .get(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.code().to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        rows.iter().map(|row| parse_kline(row)).collect()
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        let raw: RawPrice = self.get("/api/v3/ticker/price", &[("symbol", symbol.to_string())]).await?;
        Ok(raw.price)
    }
}

/// Signed account and order endpoints.
pub struct BinanceTrading {
    http_client: reqwest::Client,
    base_url: String,
    recv_window_ms: Option<u64>,
    credentials: ExchangeCredentials,
}

impl BinanceTrading {
    pub fn new(settings: &ExchangeSettings, credentials: ExchangeCredentials) -> Result<Self> {
        Ok(BinanceTrading {
            http_client: build_client(settings)?,
            base_url: settings.base_url.clone(),
            recv_window_ms: settings.recv_window_ms,
            credentials,
        })
    }

    /// Full URL with timestamp, optional recvWindow and signature appended.
    fn signed_url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = endpoint(&self.base_url, path)?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
            if let Some(window) = self.recv_window_ms {
                query.append_pair("recvWindow", &window.to_string());
            }
            query.append_pair("timestamp", &Utc::now().timestamp_millis().to_string());
        }
        let signature = sign(&self.credentials.secret_key, url.query().unwrap_or_default())?;
        url.query_pairs_mut().append_pair("signature", &signature);
        Ok(url)
    }

    async fn signed<T: DeserializeOwned>(&self, method: Method, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = self.signed_url(path, params)?;
        let response = self
            .http_client
            .request(method, url)
            .header("X-MBX-APIKEY", &self.credentials.api_key)
            .send()
            .await?;
        read_json(response).await
    }
}

#[async_trait]
impl Trading for BinanceTrading {
    async fn fetch_balances(&self) -> Result<Balances> {
        let account: RawAccount = self.signed(Method::GET, "/api/v3/account", &[]).await?;
        Ok(account
            .balances
            .into_iter()
            .filter(|b| b.free > 0.0)
            .map(|b| (b.asset, b.free))
            .collect())
    }

    async fn place_limit_order(&self, symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId> {
        let ack: RawOrderAck = self
            .signed(
                Method::POST,
                "/api/v3/order",
                &[
                    ("symbol", symbol.to_string()),
                    ("side", side.as_str().to_string()),
                    ("type", "LIMIT".to_string()),
                    ("timeInForce", "GTC".to_string()),
                    ("quantity", format_decimal(quantity)),
                    ("price", format_decimal(price)),
                ],
            )
            .await?;
        Ok(ack.order_id.to_string())
    }

    async fn cancel_open_orders(&self, symbol: &str) -> Result<usize> {
        let open: Vec<RawOrderAck> = self
            .signed(Method::GET, "/api/v3/openOrders", &[("symbol", symbol.to_string())])
            .await?;
        tracing::info!(symbol, open = open.len(), "Cancelling open orders");

        let mut cancelled = 0;
        for order in &open {
            let result: Result<Value> = self
                .signed(
                    Method::DELETE,
                    "/api/v3/order",
                    &[("symbol", symbol.to_string()), ("orderId", order.order_id.to_string())],
                )
                .await;
            match result {
                Ok(_) => cancelled += 1,
                Err(e) => tracing::warn!(symbol, order_id = order.order_id, error = %e, "Cancel failed"),
            }
            tokio::time::sleep(CANCEL_PAUSE).await;
        }
        Ok(cancelled)
    }
}
