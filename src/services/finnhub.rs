use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::{BotError, Result};

use super::market::{Candle, Fundamentals, MarketData, Quote, SymbolMatch};

const BASE_URL: &str = "https://finnhub.io/api/v1";

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String, timeout_secs: u64) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: BASE_URL.to_string(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        if !self.has_key() {
            return Err(BotError::NotConfigured("FINNHUB_API_KEY"));
        }

        let url = format!("{}{}", self.base_url, path);
        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("token", self.api_key.as_str())])
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(BotError::Api {
                service: "finnhub",
                status,
                body,
            });
        }

        Ok(res.json::<T>().await?)
    }
}

#[async_trait]
impl MarketData for FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        let q: QuoteResponse = self.get_json("/quote", &[("symbol", symbol)]).await?;

        // unknown symbols come back as an all-zero quote
        if q.c <= 0.0 && q.t == 0 {
            return Err(BotError::NoData(symbol.to_string()));
        }

        Ok(Quote {
            symbol: symbol.to_string(),
            price: q.c,
            change_pct: q.dp,
            ts: q.t,
        })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SymbolMatch>> {
        let resp: SearchResponse = self.get_json("/search", &[("q", query)]).await?;

        Ok(resp
            .result
            .into_iter()
            .filter(|it| !it.symbol.trim().is_empty())
            .take(limit)
            .map(|it| SymbolMatch {
                symbol: it.symbol,
                name: it.description,
            })
            .collect())
    }

    async fn daily_closes(&self, symbol: &str, days: i64) -> Result<Vec<Candle>> {
        let to = Utc::now().timestamp();
        let from = to - days * 86_400;
        let (from, to) = (from.to_string(), to.to_string());

        let resp: CandleResponse = self
            .get_json(
                "/stock/candle",
                &[
                    ("symbol", symbol),
                    ("resolution", "D"),
                    ("from", from.as_str()),
                    ("to", to.as_str()),
                ],
            )
            .await?;

        if resp.s != "ok" || resp.c.is_empty() {
            return Err(BotError::NoData(symbol.to_string()));
        }

        Ok(resp
            .t
            .into_iter()
            .zip(resp.c)
            .filter(|(_, c)| c.is_finite())
            .map(|(ts, close)| Candle { ts, close })
            .collect())
    }

    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals> {
        let metrics: MetricResponse = self
            .get_json("/stock/metric", &[("symbol", symbol), ("metric", "all")])
            .await?;
        let profile: ProfileResponse = self
            .get_json("/stock/profile2", &[("symbol", symbol)])
            .await
            .unwrap_or_default();

        let m = &metrics.metric;
        let pick = |keys: &[&str]| keys.iter().find_map(|k| m.get(*k).and_then(|v| v.as_f64()));

        Ok(Fundamentals {
            name: profile.name,
            pe: pick(&["peTTM", "peBasicExclExtraTTM", "peExclExtraTTM"]),
            eps: pick(&["epsTTM", "epsBasicExclExtraItemsTTM", "epsInclExtraItemsTTM"]),
            // profile2 reports millions
            market_cap: profile.market_capitalization.map(|mc| mc * 1_000_000.0),
            sector: profile.finnhub_industry,
            dividend_yield: pick(&["dividendYieldIndicatedAnnual", "currentDividendYieldTTM"]),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub description: String,

    pub symbol: String,
}

#[derive(Debug, Deserialize)]
pub struct QuoteResponse {
    // current
    pub c: f64,
    // percent change
    #[serde(default)]
    pub dp: Option<f64>,
    // timestamp
    #[serde(default)]
    pub t: i64,
}

#[derive(Debug, Deserialize)]
pub struct CandleResponse {
    // "ok" | "no_data"
    pub s: String,
    #[serde(default)]
    pub c: Vec<f64>,
    #[serde(default)]
    pub t: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MetricResponse {
    #[serde(default)]
    pub metric: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "marketCapitalization", default)]
    pub market_capitalization: Option<f64>,

    #[serde(rename = "finnhubIndustry", default)]
    pub finnhub_industry: Option<String>,
}
