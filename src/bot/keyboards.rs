use crate::models::telegram::{
    BotCommand, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup,
    ReplyMarkup,
};
use crate::services::market::SymbolMatch;

pub const CHAT: &str = "💬 Chat AI";
pub const SEARCH: &str = "🔍 Cerca";
pub const CATEGORIES_BUTTON: &str = "📂 Categorie";
pub const FAVORITES: &str = "⭐ Preferiti";
pub const ANALYSIS: &str = "📊 Analisi";
pub const REPORT: &str = "🧾 Report Giornaliero";
pub const HOME: &str = "🏠 Menu principale";

pub struct Category {
    pub button: &'static str,
    pub name: &'static str,
    pub symbols: &'static [&'static str],
}

// Finnhub symbol conventions: exchange suffixes for equities, venue prefixes for crypto and FX
pub const CATEGORIES: &[Category] = &[
    Category {
        button: "🇺🇸 USA",
        name: "USA",
        symbols: &["AAPL", "MSFT", "AMZN", "GOOG", "TSLA", "NVDA"],
    },
    Category {
        button: "🇪🇺 Europa",
        name: "EUROPA",
        symbols: &["SAP.DE", "ASML.AS", "AIR.PA", "SAN.PA"],
    },
    Category {
        button: "🇨🇳 Asia",
        name: "ASIA",
        symbols: &["9988.HK", "0700.HK", "BABA"],
    },
    Category {
        button: "🌍 Africa",
        name: "AFRICA",
        symbols: &["NPN.JO", "SBK.JO"],
    },
    Category {
        button: "💹 Crypto",
        name: "CRYPTO",
        symbols: &["BINANCE:BTCUSDT", "BINANCE:ETHUSDT"],
    },
    Category {
        button: "💱 Valute",
        name: "FX",
        symbols: &["OANDA:EUR_USD", "OANDA:GBP_USD"],
    },
];

pub fn category(button: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.button == button)
}

fn keyboard(rows: Vec<Vec<&str>>) -> ReplyMarkup {
    ReplyMarkup::Keyboard(ReplyKeyboardMarkup {
        keyboard: rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|text| KeyboardButton {
                        text: text.to_string(),
                    })
                    .collect()
            })
            .collect(),
        resize_keyboard: true,
    })
}

pub fn main_menu() -> ReplyMarkup {
    keyboard(vec![
        vec![CHAT, SEARCH],
        vec![CATEGORIES_BUTTON, FAVORITES],
        vec![ANALYSIS, REPORT],
        vec![HOME],
    ])
}

pub fn categories_menu() -> ReplyMarkup {
    let mut rows: Vec<Vec<&str>> = CATEGORIES
        .chunks(2)
        .map(|pair| pair.iter().map(|c| c.button).collect())
        .collect();
    rows.push(vec![HOME]);
    keyboard(rows)
}

pub fn ai_button(symbol: &str) -> ReplyMarkup {
    ReplyMarkup::Inline(InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton {
            text: "🧠 Analisi AI".to_string(),
            callback_data: format!("AI|{}", symbol),
        }]],
    })
}

/// One button per result; selecting it runs the analysis.
pub fn search_results(results: &[SymbolMatch]) -> ReplyMarkup {
    let inline_keyboard = results
        .iter()
        .map(|m| {
            let name: String = m.name.chars().take(30).collect();
            let text = if name.is_empty() {
                m.symbol.clone()
            } else {
                format!("{} - {}", m.symbol, name)
            };
            vec![InlineKeyboardButton {
                text,
                callback_data: format!("SEL|{}", m.symbol),
            }]
        })
        .collect();

    ReplyMarkup::Inline(InlineKeyboardMarkup { inline_keyboard })
}

pub fn bot_commands() -> Vec<BotCommand> {
    vec![
        BotCommand { command: "start", description: "Avvia AngelBot" },
        BotCommand { command: "help", description: "Guida rapida" },
        BotCommand { command: "prezzo", description: "/prezzo TICKER prezzo attuale" },
        BotCommand { command: "analizza", description: "Analizza /analizza TICKER" },
        BotCommand { command: "watch", description: "/watch TICKER aggiungi ai preferiti" },
        BotCommand { command: "unwatch", description: "/unwatch TICKER rimuovi preferito" },
        BotCommand { command: "list", description: "Mostra preferiti" },
        BotCommand { command: "notify", description: "/notify TICKER PCT soglia notifiche" },
        BotCommand { command: "frequenza", description: "/frequenza MINUTI intervallo notifiche" },
        BotCommand { command: "report", description: "Invia report giornaliero" },
        BotCommand { command: "ai", description: "/ai DOMANDA chiedi all'AI" },
    ]
}
