use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub change_pct: Option<f64>,
    // unix seconds, as reported by the provider
    pub ts: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolMatch {
    pub symbol: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Candle {
    pub ts: i64,
    pub close: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Fundamentals {
    pub name: Option<String>,
    pub pe: Option<f64>,
    pub eps: Option<f64>,
    pub market_cap: Option<f64>,
    pub sector: Option<String>,
    pub dividend_yield: Option<f64>,
}

impl Fundamentals {
    pub fn is_empty(&self) -> bool {
        self.pe.is_none() && self.eps.is_none() && self.market_cap.is_none()
    }
}

/// Finance data provider seen by the bot and the alert loop.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SymbolMatch>>;

    /// Daily closes for roughly the last `days` calendar days, oldest first.
    async fn daily_closes(&self, symbol: &str, days: i64) -> Result<Vec<Candle>>;

    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals>;
}
