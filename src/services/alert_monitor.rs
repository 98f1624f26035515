//! Debounced threshold-crossing notifier.
//!
//! Every tick fetches one quote per watched symbol and compares it to each
//! entry's baseline. The first observation only records the baseline. An alert
//! fires when the move passes the entry's threshold and the debounce window
//! since the previous alert has elapsed; firing re-bases the entry to the
//! observed price. Each entry is persisted before the next one is looked at.

use std::{collections::BTreeMap, time::Duration};

use chrono::Utc;
use futures_util::{StreamExt, stream};
use tokio::{task::JoinHandle, time};

use crate::{
    AppState,
    error::Result,
    models::{ChatId, UserState, WatchEntry},
    render,
};

use super::{report_service, stocks_service};

const QUOTE_CONCURRENCY: usize = 4;
const ALERT_CHART_DAYS: i64 = 31;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Evaluation {
    // no usable baseline yet: record the price, stay quiet
    SetBaseline,
    // inside the threshold
    Hold { change_pct: f64 },
    // past the threshold but an alert went out less than one window ago
    Debounced { change_pct: f64 },
    Fire { baseline: f64, change_pct: f64 },
}

/// Pure decision for one entry at one observed price.
pub fn evaluate(entry: &WatchEntry, price: f64, now: i64, window_secs: i64) -> Evaluation {
    let Some(baseline) = entry.baseline() else {
        return Evaluation::SetBaseline;
    };

    let change_pct = (price - baseline) / baseline * 100.0;
    if !entry.direction.crossed(change_pct, entry.threshold_pct) {
        return Evaluation::Hold { change_pct };
    }

    if let Some(last) = entry.last_notified_at {
        if now - last < window_secs {
            return Evaluation::Debounced { change_pct };
        }
    }

    Evaluation::Fire {
        baseline,
        change_pct,
    }
}

/// Entry interval, else the chat's, else the global default. In seconds.
pub fn debounce_window_secs(entry: &WatchEntry, user: &UserState, default_min: u32) -> i64 {
    let minutes = entry
        .interval_min
        .or(user.interval_min)
        .unwrap_or(default_min);
    i64::from(minutes) * 60
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub symbols: usize,
    pub failed_symbols: usize,
    pub checked: usize,
    pub baselined: usize,
    pub fired: usize,
    pub undelivered: usize,
}

pub fn spawn_price_alert_monitor(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(state.settings.alert_poll_secs);
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        tracing::info!(every_secs = period.as_secs(), "alert monitor started");

        loop {
            interval.tick().await;

            match run_tick(&state, Utc::now().timestamp()).await {
                Ok(s) if s.fired > 0 || s.failed_symbols > 0 => {
                    tracing::info!(?s, "alert tick");
                }
                Ok(s) => tracing::debug!(?s, "alert tick"),
                Err(e) => tracing::warn!(error = %e, "alert tick failed"),
            }

            if let Err(e) = report_service::send_due_reports(&state, Utc::now()).await {
                tracing::warn!(error = %e, "daily report round failed");
            }
        }
    })
}

struct Target {
    chat_id: ChatId,
    window_secs: i64,
}

pub async fn run_tick(state: &AppState, now: i64) -> Result<TickSummary> {
    let data = state.store.try_load().await?;
    let default_min = state.settings.notify_interval_min;

    let mut by_symbol: BTreeMap<String, Vec<Target>> = BTreeMap::new();
    for (chat_id, user) in &data.users {
        for (sym, entry) in &user.notifications {
            by_symbol.entry(sym.clone()).or_default().push(Target {
                chat_id: *chat_id,
                window_secs: debounce_window_secs(entry, user, default_min),
            });
        }
    }

    let mut summary = TickSummary {
        symbols: by_symbol.len(),
        ..TickSummary::default()
    };
    if by_symbol.is_empty() {
        return Ok(summary);
    }

    let quotes: Vec<(String, Option<f64>)> = stream::iter(by_symbol.keys().cloned())
        .map(|sym| async move {
            let price = match state.market.quote(&sym).await {
                Ok(q) if q.price.is_finite() && q.price > 0.0 => Some(q.price),
                Ok(q) => {
                    tracing::debug!(symbol = %sym, price = q.price, "unusable quote");
                    None
                }
                Err(e) => {
                    tracing::warn!(symbol = %sym, error = %e, "quote failed, retrying next tick");
                    None
                }
            };
            (sym, price)
        })
        .buffer_unordered(QUOTE_CONCURRENCY)
        .collect()
        .await;

    for (sym, price) in quotes {
        let Some(price) = price else {
            summary.failed_symbols += 1;
            continue;
        };

        for target in &by_symbol[&sym] {
            summary.checked += 1;
            if let Err(e) = process_entry(state, target, &sym, price, now, &mut summary).await {
                tracing::warn!(chat_id = target.chat_id, symbol = %sym, error = %e, "alert entry failed");
            }
        }
    }

    Ok(summary)
}

async fn process_entry(
    state: &AppState,
    target: &Target,
    sym: &str,
    price: f64,
    now: i64,
    summary: &mut TickSummary,
) -> Result<()> {
    // re-read: the snapshot may be stale if a command changed the entry meanwhile
    let Some(entry) = state
        .store
        .user(target.chat_id)
        .await
        .and_then(|u| u.notifications.get(sym).cloned())
    else {
        return Ok(());
    };

    match evaluate(&entry, price, now, target.window_secs) {
        Evaluation::SetBaseline => {
            rebase(state, target.chat_id, sym, price, None).await?;
            summary.baselined += 1;
        }
        Evaluation::Hold { .. } | Evaluation::Debounced { .. } => {}
        Evaluation::Fire {
            baseline,
            change_pct,
        } => {
            tracing::info!(
                chat_id = target.chat_id,
                symbol = sym,
                baseline,
                price,
                change_pct,
                "threshold crossed"
            );

            match send_alert(state, target.chat_id, &entry, baseline, price, change_pct).await {
                Ok(()) => {
                    rebase(state, target.chat_id, sym, price, Some(now)).await?;
                    summary.fired += 1;
                }
                Err(e) => {
                    // left un-rebased so the next due tick tries again
                    tracing::warn!(chat_id = target.chat_id, symbol = sym, error = %e, "alert not delivered");
                    summary.undelivered += 1;
                }
            }
        }
    }
    Ok(())
}

async fn rebase(
    state: &AppState,
    chat_id: ChatId,
    sym: &str,
    price: f64,
    notified_at: Option<i64>,
) -> Result<()> {
    state
        .store
        .update(|data| {
            let Some(entry) = data
                .users
                .get_mut(&chat_id)
                .and_then(|u| u.notifications.get_mut(sym))
            else {
                return;
            };
            entry.baseline_price = Some(price);
            if notified_at.is_some() {
                entry.last_notified_at = notified_at;
            }
        })
        .await
}

pub fn alert_caption(
    state: &AppState,
    entry: &WatchEntry,
    baseline: f64,
    price: f64,
    change_pct: f64,
) -> String {
    let arrow = if change_pct > 0.0 { "▲" } else { "▼" };
    let ctx = serde_json::json!({
        "symbol": entry.symbol,
        "baseline": render::fmt2(baseline),
        "price": render::fmt2(price),
        "arrow": arrow,
        "change": render::fmt2(change_pct),
        "threshold": entry.threshold_pct.to_string(),
    });

    let fallback = format!(
        "🔔 {} {} {:.2}% ({:.2}$ → {:.2}$)",
        entry.symbol, arrow, change_pct, baseline, price
    );
    render::message_or(state, "alert", &ctx, &fallback)
}

async fn send_alert(
    state: &AppState,
    chat_id: ChatId,
    entry: &WatchEntry,
    baseline: f64,
    price: f64,
    change_pct: f64,
) -> Result<()> {
    let caption = alert_caption(state, entry, baseline, price, change_pct);

    if state.settings.chart_on_alert {
        if let Some(png) =
            stocks_service::chart_png(state, &entry.symbol, ALERT_CHART_DAYS, "1 mese").await
        {
            match state.chat.send_photo(chat_id, png, &caption).await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!(chat_id, error = %e, "alert photo failed, sending text"),
            }
        }
    }

    state.chat.send_message(chat_id, &caption, None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;

    const WINDOW: i64 = 15 * 60;

    fn entry(baseline: Option<f64>, threshold: f64) -> WatchEntry {
        WatchEntry {
            baseline_price: baseline,
            ..WatchEntry::new("AAPL", threshold)
        }
    }

    #[test]
    fn first_observation_only_sets_baseline() {
        assert_eq!(evaluate(&entry(None, 5.0), 100.0, 0, WINDOW), Evaluation::SetBaseline);
    }

    #[test]
    fn fires_past_threshold_only() {
        let e = entry(Some(100.0), 5.0);
        assert!(matches!(
            evaluate(&e, 106.0, 0, WINDOW),
            Evaluation::Fire { baseline, .. } if baseline == 100.0
        ));
        assert!(matches!(evaluate(&e, 103.0, 0, WINDOW), Evaluation::Hold { .. }));
        assert!(matches!(evaluate(&e, 94.0, 0, WINDOW), Evaluation::Fire { .. }));
    }

    #[test]
    fn threshold_is_inclusive() {
        let e = entry(Some(100.0), 5.0);
        assert!(matches!(evaluate(&e, 105.0, 0, WINDOW), Evaluation::Fire { .. }));
    }

    #[test]
    fn debounce_window_suppresses_repeat() {
        let mut e = entry(Some(100.0), 5.0);
        e.last_notified_at = Some(1_000);

        assert!(matches!(
            evaluate(&e, 110.0, 1_000 + WINDOW - 1, WINDOW),
            Evaluation::Debounced { .. }
        ));
        assert!(matches!(
            evaluate(&e, 110.0, 1_000 + WINDOW, WINDOW),
            Evaluation::Fire { .. }
        ));
    }

    #[test]
    fn direction_filters_moves() {
        let mut e = entry(Some(100.0), 5.0);
        e.direction = Direction::Up;
        assert!(matches!(evaluate(&e, 90.0, 0, WINDOW), Evaluation::Hold { .. }));

        e.direction = Direction::Down;
        assert!(matches!(evaluate(&e, 110.0, 0, WINDOW), Evaluation::Hold { .. }));
        assert!(matches!(evaluate(&e, 90.0, 0, WINDOW), Evaluation::Fire { .. }));
    }

    #[test]
    fn window_prefers_entry_then_user_then_default() {
        let mut user = UserState::new(1);
        let mut e = entry(None, 2.0);
        assert_eq!(debounce_window_secs(&e, &user, 15), 15 * 60);

        user.interval_min = Some(30);
        assert_eq!(debounce_window_secs(&e, &user, 15), 30 * 60);

        e.interval_min = Some(5);
        assert_eq!(debounce_window_secs(&e, &user, 15), 5 * 60);
    }
}
