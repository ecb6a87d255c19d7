// Exchange and advisory collaborators, split by capability: market data needs
// no credentials, trading does.
pub mod binance;
pub mod paper;

use async_trait::async_trait;
use shared::models::{Balances, Candle, Interval, OrderSide, Recommendation, Ticker};
use std::sync::Arc;

use crate::error::Result;

pub type OrderId = String;

/// Public market data.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>>;

    /// The most recent `limit` candles for `symbol`, oldest first.
    async fn fetch_candles(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Candle>>;

    async fn fetch_price(&self, symbol: &str) -> Result<f64>;
}

/// Authenticated account access and order entry.
#[async_trait]
pub trait Trading: Send + Sync {
    async fn fetch_balances(&self) -> Result<Balances>;

    async fn place_limit_order(&self, symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId>;

    /// Cancel every open order on `symbol`, returning how many were cancelled.
    async fn cancel_open_orders(&self, symbol: &str) -> Result<usize>;
}

/// Grid level oracle.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn advise(&self, context: &str) -> Result<Recommendation>;
}

pub type SharedMarketData = Arc<dyn MarketData>;
pub type SharedTrading = Arc<dyn Trading>;
pub type SharedAdvisor = Arc<dyn Advisor>;
