use crate::{
    AppState,
    error::Result,
    models::{ChatId, Direction, WatchEntry},
};

pub const MAX_INTERVAL_MIN: u32 = 24 * 60;

#[derive(Debug, Clone)]
pub struct NotifyRequest {
    pub symbol: String,
    pub threshold_pct: f64,
    pub direction: Option<Direction>,
    pub interval_min: Option<u32>,
}

/// Adds a favorite with a default watch entry. Returns false if already watched.
pub async fn watch(state: &AppState, chat_id: ChatId, symbol: &str) -> Result<bool> {
    let pct = state.settings.notif_pct_default;
    state
        .store
        .update_user(chat_id, |u| {
            if !u.add_favorite(symbol) {
                return false;
            }
            u.notifications
                .entry(symbol.to_string())
                .or_insert_with(|| WatchEntry::new(symbol, pct));
            true
        })
        .await
}

/// Removes a favorite and its watch entry. Returns false if it was not watched.
pub async fn unwatch(state: &AppState, chat_id: ChatId, symbol: &str) -> Result<bool> {
    state
        .store
        .update_user(chat_id, |u| u.remove_favorite(symbol))
        .await
}

/// Creates or updates a watch entry. An existing baseline is kept.
pub async fn set_notification(
    state: &AppState,
    chat_id: ChatId,
    req: NotifyRequest,
) -> Result<WatchEntry> {
    state
        .store
        .update_user(chat_id, |u| {
            let entry = u
                .notifications
                .entry(req.symbol.clone())
                .or_insert_with(|| WatchEntry::new(&req.symbol, req.threshold_pct));

            entry.threshold_pct = req.threshold_pct;
            if let Some(d) = req.direction {
                entry.direction = d;
            }
            if req.interval_min.is_some() {
                entry.interval_min = req.interval_min;
            }
            entry.clone()
        })
        .await
}

/// Per-chat debounce window for entries without their own interval.
pub async fn set_frequency(state: &AppState, chat_id: ChatId, minutes: u32) -> Result<()> {
    state
        .store
        .update_user(chat_id, |u| u.interval_min = Some(minutes))
        .await
}

/// Favorites in insertion order, each with its watch entry if any.
pub async fn favorites(state: &AppState, chat_id: ChatId) -> Vec<(String, Option<WatchEntry>)> {
    let Some(user) = state.store.user(chat_id).await else {
        return Vec::new();
    };

    let mut out: Vec<(String, Option<WatchEntry>)> = user
        .favorites
        .iter()
        .map(|s| (s.clone(), user.notifications.get(s).cloned()))
        .collect();

    // entries set through /notify without being a favorite
    for (sym, entry) in &user.notifications {
        if !user.is_favorite(sym) {
            out.push((sym.clone(), Some(entry.clone())));
        }
    }
    out
}
