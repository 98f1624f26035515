use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WatchEntry;

pub type ChatId = i64;

/// Max AI turns kept per chat.
pub const CONTEXT_LIMIT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    // next message is a search query
    Search,
    // messages go to the AI until a command or menu entry is picked
    Chat,
    // next message is a ticker to analyse
    Analysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    pub ts: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub chat_id: ChatId,

    #[serde(default)]
    pub favorites: Vec<String>,

    #[serde(default)]
    pub notifications: BTreeMap<String, WatchEntry>,

    #[serde(default)]
    pub mode: Option<Mode>,

    #[serde(default)]
    pub context: Vec<ChatTurn>,

    #[serde(default = "default_true")]
    pub daily_ai: bool,

    #[serde(default)]
    pub interval_min: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl UserState {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            favorites: Vec::new(),
            notifications: BTreeMap::new(),
            mode: None,
            context: Vec::new(),
            daily_ai: true,
            interval_min: None,
        }
    }

    pub fn is_favorite(&self, symbol: &str) -> bool {
        self.favorites.iter().any(|s| s == symbol)
    }

    /// Returns false if the symbol was already a favorite.
    pub fn add_favorite(&mut self, symbol: &str) -> bool {
        if self.is_favorite(symbol) {
            return false;
        }
        self.favorites.push(symbol.to_string());
        true
    }

    /// Removes the favorite and its watch entry. Returns false if there was
    /// neither.
    pub fn remove_favorite(&mut self, symbol: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|s| s != symbol);
        let had_entry = self.notifications.remove(symbol).is_some();
        self.favorites.len() != before || had_entry
    }

    pub fn push_turn(&mut self, role: &str, content: &str, ts: i64) {
        self.context.push(ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
            ts,
        });
        if self.context.len() > CONTEXT_LIMIT {
            let drop = self.context.len() - CONTEXT_LIMIT;
            self.context.drain(..drop);
        }
    }
}

/// Everything persisted in the data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub users: BTreeMap<ChatId, UserState>,

    #[serde(default)]
    pub last_daily_report_at: Option<i64>,
}

impl StoreData {
    pub fn user_mut(&mut self, chat_id: ChatId) -> &mut UserState {
        self.users
            .entry(chat_id)
            .or_insert_with(|| UserState::new(chat_id))
    }

    pub fn watch_count(&self) -> usize {
        self.users.values().map(|u| u.notifications.len()).sum()
    }
}
