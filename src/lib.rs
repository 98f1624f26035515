//! Library entrypoint for AngelBot.
//!
//! The binary only wires settings and clients together; everything else lives
//! here so integration tests under `tests/` can build an `AppState` with fake
//! adapters and drive the routers and the alert loop directly.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;

#[path = "middleware/webhook_auth.rs"]
pub mod webhook_auth;

pub mod services;

#[path = "views/render.rs"]
pub mod render;
#[path = "views/templates.rs"]
pub mod templates;

pub mod bot;
pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub hbs: templates::Hbs,
    pub store: Arc<services::store::JsonStore>,
    pub settings: config::Settings,
    pub market: Arc<dyn services::market::MarketData>,
    pub chat: Arc<dyn services::telegram::ChatSender>,
    pub ai: Arc<dyn services::openai::AiClient>,
}
