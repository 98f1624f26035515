#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use angelbot::{
    AppState, config,
    error::{BotError, Result},
    models::{ChatId, telegram::ReplyMarkup},
    services::{
        market::{Candle, Fundamentals, MarketData, Quote, SymbolMatch},
        openai::{AiClient, ChatMessage},
        store::JsonStore,
        telegram::ChatSender,
    },
    templates,
};

#[derive(Default)]
pub struct FakeMarket {
    prices: Mutex<HashMap<String, f64>>,
    failing: Mutex<HashSet<String>>,
    closes: Mutex<HashMap<String, Vec<f64>>>,
    pub search_results: Mutex<Vec<SymbolMatch>>,
    pub quote_calls: Mutex<Vec<String>>,
}

impl FakeMarket {
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.lock().unwrap().insert(symbol.to_string(), price);
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.lock().unwrap().insert(symbol.to_string());
    }

    pub fn set_closes(&self, symbol: &str, closes: Vec<f64>) {
        self.closes.lock().unwrap().insert(symbol.to_string(), closes);
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn quote(&self, symbol: &str) -> Result<Quote> {
        self.quote_calls.lock().unwrap().push(symbol.to_string());

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(BotError::Api {
                service: "fake",
                status: 503,
                body: "down".into(),
            });
        }

        let price = self
            .prices
            .lock()
            .unwrap()
            .get(symbol)
            .copied()
            .ok_or_else(|| BotError::NoData(symbol.to_string()))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            price,
            change_pct: None,
            ts: 0,
        })
    }

    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SymbolMatch>> {
        let results = self.search_results.lock().unwrap();
        Ok(results.iter().take(limit).cloned().collect())
    }

    async fn daily_closes(&self, symbol: &str, _days: i64) -> Result<Vec<Candle>> {
        let closes = self
            .closes
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| BotError::NoData(symbol.to_string()))?;

        Ok(closes
            .into_iter()
            .enumerate()
            .map(|(i, close)| Candle {
                ts: 1_700_000_000 + i as i64 * 86_400,
                close,
            })
            .collect())
    }

    async fn fundamentals(&self, _symbol: &str) -> Result<Fundamentals> {
        Ok(Fundamentals::default())
    }
}

#[derive(Default)]
pub struct FakeChat {
    pub messages: Mutex<Vec<(ChatId, String)>>,
    pub markups: Mutex<Vec<Option<ReplyMarkup>>>,
    pub photos: Mutex<Vec<(ChatId, String)>>,
    pub acks: Mutex<Vec<String>>,
    broken: Mutex<bool>,
    photos_broken: Mutex<bool>,
}

impl FakeChat {
    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<String> {
        self.texts().pop()
    }

    pub fn set_broken(&self, broken: bool) {
        *self.broken.lock().unwrap() = broken;
    }

    /// Only `send_photo` fails; text still goes through.
    pub fn set_photos_broken(&self, broken: bool) {
        *self.photos_broken.lock().unwrap() = broken;
    }
}

#[async_trait]
impl ChatSender for FakeChat {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> Result<()> {
        if *self.broken.lock().unwrap() {
            return Err(BotError::NotConfigured("TELEGRAM_TOKEN"));
        }
        self.messages
            .lock()
            .unwrap()
            .push((chat_id, text.to_string()));
        self.markups.lock().unwrap().push(markup.cloned());
        Ok(())
    }

    async fn send_photo(&self, chat_id: ChatId, png: Vec<u8>, caption: &str) -> Result<()> {
        if *self.photos_broken.lock().unwrap() {
            return Err(BotError::Api {
                service: "telegram",
                status: 400,
                body: "wrong file".into(),
            });
        }
        assert!(png.starts_with(b"\x89PNG"), "photo is not a PNG");
        self.photos
            .lock()
            .unwrap()
            .push((chat_id, caption.to_string()));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: &str) -> Result<()> {
        self.acks.lock().unwrap().push(callback_id.to_string());
        Ok(())
    }
}

pub struct NoAi;

#[async_trait]
impl AiClient for NoAi {
    fn is_configured(&self) -> bool {
        false
    }

    async fn complete(&self, _: &[ChatMessage], _: u32, _: f32) -> Result<String> {
        Err(BotError::NotConfigured("OPENAI_API_KEY"))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub market: Arc<FakeMarket>,
    pub chat: Arc<FakeChat>,
    pub dir: tempfile::TempDir,
}

pub fn test_app_with(settings: config::Settings) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let market = Arc::new(FakeMarket::default());
    let chat = Arc::new(FakeChat::default());

    let settings = config::Settings {
        data_file: dir.path().join("users.json"),
        ..settings
    };

    let state = AppState {
        hbs: templates::build_handlebars().unwrap(),
        store: Arc::new(JsonStore::new(settings.data_file.clone())),
        settings,
        market: market.clone(),
        chat: chat.clone(),
        ai: Arc::new(NoAi),
    };

    TestApp {
        state,
        market,
        chat,
        dir,
    }
}

/// Text-only alerts. Chart tests opt in through [`test_app_with`].
pub fn test_app() -> TestApp {
    test_app_with(config::Settings {
        chart_on_alert: false,
        ..config::Settings::default()
    })
}

/// Closes rising from 100 by 0.5 per day.
pub fn rising_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64 * 0.5).collect()
}
