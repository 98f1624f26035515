use chrono::{DateTime, Timelike, Utc};
use futures_util::{StreamExt, stream};

use crate::{AppState, error::Result, models::ChatId, render};

use super::{
    analysis::{self, Analysis},
    commentary_service, stocks_service,
};

const TOP_ROWS: usize = 8;
const TOP_AI: usize = 3;
const MIN_GAP_SECS: i64 = 20 * 3600;
const ANALYSIS_CONCURRENCY: usize = 3;

pub const NO_FAVORITES: &str =
    "Non hai preferiti. Aggiungi con /watch TICKER per ricevere il report giornaliero.";

/// True inside the report hour, unless a report already went out in the last 20 h.
pub fn report_due(now: DateTime<Utc>, settings: &crate::config::Settings, last: Option<i64>) -> bool {
    let local = now.with_timezone(&settings.report_tz);
    if local.hour() != settings.daily_report_hour {
        return false;
    }
    match last {
        Some(ts) => now.timestamp() - ts >= MIN_GAP_SECS,
        None => true,
    }
}

/// Sends the daily report to every chat when it is due.
pub async fn send_due_reports(state: &AppState, now: DateTime<Utc>) -> Result<()> {
    let settings = &state.settings;

    // claim the slot before sending so a slow round is not repeated
    let chats: Option<Vec<ChatId>> = state
        .store
        .update(|data| {
            if !report_due(now, settings, data.last_daily_report_at) {
                return None;
            }
            data.last_daily_report_at = Some(now.timestamp());
            Some(data.users.keys().copied().collect())
        })
        .await?;

    let Some(chats) = chats else {
        return Ok(());
    };

    tracing::info!(chats = chats.len(), "sending daily reports");
    for chat_id in chats {
        if let Err(e) = send_daily_report(state, chat_id, now).await {
            tracing::warn!(chat_id, error = %e, "daily report failed");
        }
    }
    Ok(())
}

/// Ranks the chat's favorites and sends the report, plus an AI comment when enabled.
pub async fn send_daily_report(state: &AppState, chat_id: ChatId, now: DateTime<Utc>) -> Result<()> {
    let user = state.store.user(chat_id).await;
    let favorites = user.as_ref().map(|u| u.favorites.clone()).unwrap_or_default();
    let daily_ai = user.as_ref().is_none_or(|u| u.daily_ai);

    if favorites.is_empty() {
        return state.chat.send_message(chat_id, NO_FAVORITES, None).await;
    }

    let mut ranked: Vec<(f64, Analysis)> = stream::iter(favorites)
        .map(|sym| async move { stocks_service::analyze_symbol(state, &sym).await })
        .buffer_unordered(ANALYSIS_CONCURRENCY)
        .filter_map(|a| async move { a })
        .map(|a| (analysis::report_score(&a), a))
        .collect()
        .await;

    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
    ranked.truncate(TOP_ROWS);

    let text = report_text(state, &ranked, now);
    state.chat.send_message(chat_id, &text, None).await?;

    if daily_ai {
        let top: Vec<&Analysis> = ranked.iter().take(TOP_AI).map(|(_, a)| a).collect();
        if let Some(comment) = commentary_service::daily_comment(state, &top).await {
            let msg = format!("🤖 <b>Commento AI</b>\n{}", render::escape(&comment));
            state.chat.send_message(chat_id, &msg, None).await?;
        }
    }
    Ok(())
}

fn report_text(state: &AppState, ranked: &[(f64, Analysis)], now: DateTime<Utc>) -> String {
    let when = now
        .with_timezone(&state.settings.report_tz)
        .format("%d/%m/%Y %H:%M")
        .to_string();

    let rows: Vec<_> = ranked
        .iter()
        .map(|(_, a)| {
            serde_json::json!({
                "symbol": a.symbol,
                "latest": render::fmt2(a.latest),
                "trend": a.trend.kind.label(),
                "signals": (!a.signals.is_empty()).then(|| a.signals.join(", ")),
            })
        })
        .collect();

    let ctx = serde_json::json!({ "when": when, "rows": rows });
    render::message_or(state, "daily_report", &ctx, "Report giornaliero non disponibile.")
}
