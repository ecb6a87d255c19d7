// In-memory exchange. Serves seeded market data and records limit orders
// without matching them; a resting order locks its funds until cancelled.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{Balances, Candle, Interval, OrderSide, Ticker};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{MarketData, OrderId, Trading};
use crate::data::market_data::MarketDataStore;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
    pub placed_at: DateTime<Utc>,
}

#[derive(Default)]
struct Book {
    balances: Balances,
    open_orders: Vec<PaperOrder>,
    // Asset each symbol trades against, for locking funds.
    quote_asset: String,
    candle_fetches: HashMap<Interval, usize>,
    fail_candles: bool,
    fail_orders: bool,
}

pub struct PaperExchange {
    store: Arc<RwLock<MarketDataStore>>,
    book: RwLock<Book>,
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperExchange {
    pub fn new() -> Self {
        Self::with_store(Arc::new(RwLock::new(MarketDataStore::new())))
    }

    pub fn with_store(store: Arc<RwLock<MarketDataStore>>) -> Self {
        PaperExchange {
            store,
            book: RwLock::new(Book { quote_asset: "USDT".to_string(), ..Default::default() }),
        }
    }

    pub async fn add_candles(&self, symbol: &str, interval: Interval, candles: Vec<Candle>) {
        self.store.write().await.add_candles(symbol, interval, candles);
    }

    pub async fn set_ticker(&self, ticker: Ticker) {
        self.store.write().await.upsert_ticker(ticker);
    }

    pub async fn set_tickers(&self, tickers: Vec<Ticker>) {
        let mut store = self.store.write().await;
        for ticker in tickers {
            store.upsert_ticker(ticker);
        }
    }

    pub async fn set_price(&self, symbol: &str, price: f64) {
        self.store.write().await.set_price(symbol, price);
    }

    pub async fn set_balance(&self, asset: &str, free: f64) {
        self.book.write().await.balances.set(asset, free);
    }

    pub async fn set_quote_asset(&self, asset: &str) {
        self.book.write().await.quote_asset = asset.to_string();
    }

    /// Make every candle query fail, as an unreachable exchange would.
    pub async fn fail_candles(&self, fail: bool) {
        self.book.write().await.fail_candles = fail;
    }

    /// Reject every order submission.
    pub async fn fail_orders(&self, fail: bool) {
        self.book.write().await.fail_orders = fail;
    }

    /// Number of candle queries made at `interval`, failed ones included.
    pub async fn candle_fetches(&self, interval: Interval) -> usize {
        self.book.read().await.candle_fetches.get(&interval).copied().unwrap_or(0)
    }

    /// Resting orders in submission order.
    pub async fn open_orders(&self) -> Vec<PaperOrder> {
        self.book.read().await.open_orders.clone()
    }

    pub async fn balances(&self) -> Balances {
        self.book.read().await.balances.clone()
    }
}

/// Asset and amount a resting order holds back.
fn locked_funds(order: &PaperOrder, quote_asset: &str) -> (String, f64) {
    match order.side {
        OrderSide::Buy => (quote_asset.to_string(), order.quantity * order.price),
        OrderSide::Sell => {
            let base = shared::utils::base_asset(&order.symbol, quote_asset);
            (base.to_string(), order.quantity)
        }
    }
}

#[async_trait]
impl MarketData for PaperExchange {
    async fn fetch_tickers(&self) -> Result<Vec<Ticker>> {
        Ok(self.store.read().await.tickers().to_vec())
    }

    async fn fetch_candles(&self, symbol: &str, interval: Interval, limit: u32) -> Result<Vec<Candle>> {
        {
            let mut book = self.book.write().await;
            *book.candle_fetches.entry(interval).or_insert(0) += 1;
            if book.fail_candles {
                return Err(EngineError::ExchangeError {
                    status: 503,
                    body: format!("candles unavailable for {} {}", symbol, interval),
                });
            }
        }

        let store = self.store.read().await;
        Ok(store
            .latest_candles(symbol, interval, limit as usize)
            .unwrap_or_default())
    }

    async fn fetch_price(&self, symbol: &str) -> Result<f64> {
        self.store.read().await.price(symbol).ok_or_else(|| EngineError::ExchangeError {
            status: 400,
            body: format!("Invalid symbol '{}'", symbol),
        })
    }
}

#[async_trait]
impl Trading for PaperExchange {
    async fn fetch_balances(&self) -> Result<Balances> {
        Ok(self.book.read().await.balances.clone())
    }

    async fn place_limit_order(&self, symbol: &str, side: OrderSide, quantity: f64, price: f64) -> Result<OrderId> {
        let mut book = self.book.write().await;
        if book.fail_orders {
            return Err(EngineError::ExchangeError { status: 400, body: "order rejected".to_string() });
        }
        if quantity <= 0.0 || price <= 0.0 {
            return Err(EngineError::ExchangeError {
                status: 400,
                body: format!("invalid quantity {} or price {}", quantity, price),
            });
        }

        let order = PaperOrder {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.to_string(),
            side,
            quantity,
            price,
            placed_at: Utc::now(),
        };
        let (asset, amount) = locked_funds(&order, &book.quote_asset);
        let free = book.balances.free(&asset);
        if free + 1e-9 < amount {
            return Err(EngineError::InsufficientFunds(format!(
                "{} {} needs {:.8} {}, {:.8} free",
                side, symbol, amount, asset, free
            )));
        }
        book.balances.set(&asset, (free - amount).max(0.0));

        tracing::info!(order_id = %order.id, symbol, %side, quantity, price, "Paper order recorded");
        let id = order.id.clone();
        book.open_orders.push(order);
        Ok(id)
    }

    async fn cancel_open_orders(&self, symbol: &str) -> Result<usize> {
        let mut book = self.book.write().await;
        let (cancelled, kept): (Vec<_>, Vec<_>) =
            std::mem::take(&mut book.open_orders).into_iter().partition(|o| o.symbol == symbol);
        book.open_orders = kept;

        for order in &cancelled {
            let (asset, amount) = locked_funds(order, &book.quote_asset);
            let free = book.balances.free(&asset);
            book.balances.set(&asset, free + amount);
        }
        tracing::info!(symbol, cancelled = cancelled.len(), "Paper orders cancelled");
        Ok(cancelled.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::summary::test_support::flat_candles;

    #[tokio::test]
    async fn buy_locks_quote_and_cancel_releases_it() {
        let exchange = PaperExchange::new();
        exchange.set_balance("USDT", 100.0).await;

        let id = exchange.place_limit_order("PEPEUSDT", OrderSide::Buy, 800.0, 0.02).await.unwrap();
        assert!(!id.is_empty());
        assert!((exchange.balances().await.free("USDT") - 84.0).abs() < 1e-9);

        assert_eq!(exchange.cancel_open_orders("PEPEUSDT").await.unwrap(), 1);
        assert!((exchange.balances().await.free("USDT") - 100.0).abs() < 1e-9);
        assert!(exchange.open_orders().await.is_empty());
    }

    #[tokio::test]
    async fn sell_without_coin_is_rejected() {
        let exchange = PaperExchange::new();
        let err = exchange.place_limit_order("PEPEUSDT", OrderSide::Sell, 10.0, 0.03).await.unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds(_)));

        exchange.set_balance("PEPE", 10.0).await;
        exchange.place_limit_order("PEPEUSDT", OrderSide::Sell, 10.0, 0.03).await.unwrap();
        assert_eq!(exchange.balances().await.free("PEPE"), 0.0);
    }

    #[tokio::test]
    async fn cancel_only_touches_the_given_symbol() {
        let exchange = PaperExchange::new();
        exchange.set_balance("USDT", 100.0).await;
        exchange.place_limit_order("AUSDT", OrderSide::Buy, 1.0, 1.0).await.unwrap();
        exchange.place_limit_order("BUSDT", OrderSide::Buy, 1.0, 1.0).await.unwrap();

        assert_eq!(exchange.cancel_open_orders("AUSDT").await.unwrap(), 1);
        let remaining = exchange.open_orders().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].symbol, "BUSDT");
    }

    #[tokio::test]
    async fn candle_queries_are_counted_and_can_fail() {
        let exchange = PaperExchange::new();
        exchange.add_candles("XUSDT", Interval::Day1, flat_candles(10, 1.0, 5.0)).await;

        assert_eq!(exchange.fetch_candles("XUSDT", Interval::Day1, 4).await.unwrap().len(), 4);
        assert!(exchange.fetch_candles("XUSDT", Interval::Month1, 4).await.unwrap().is_empty());

        exchange.fail_candles(true).await;
        assert!(exchange.fetch_candles("XUSDT", Interval::Day1, 4).await.is_err());
        assert_eq!(exchange.candle_fetches(Interval::Day1).await, 2);
        assert_eq!(exchange.candle_fetches(Interval::Month1).await, 1);
    }

    #[tokio::test]
    async fn unknown_symbol_has_no_price() {
        let exchange = PaperExchange::new();
        let err = exchange.fetch_price("NOPEUSDT").await.unwrap_err();
        assert!(matches!(err, EngineError::ExchangeError { status: 400, .. }));
    }
}
