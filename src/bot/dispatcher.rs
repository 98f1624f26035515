//! Routes one Telegram update to the right reply.
//!
//! Failures never bubble up to the webhook: they are logged and, when it makes
//! sense, turned into a short message for the user.

use chrono::Utc;

use crate::{
    AppState,
    error::Result,
    models::{
        ChatId, Mode, symbol,
        telegram::{CallbackQuery, Message, Update},
    },
    render,
    services::{
        alerts_service::{self, NotifyRequest},
        commentary_service, report_service,
        stocks_service::{self, ANALYSIS_DAYS},
    },
};

use super::{
    commands::{self, Callback, Command},
    keyboards,
};

const SEARCH_LIMIT: usize = 6;
const SELECT_CHART_DAYS: i64 = 92;

pub async fn handle_update(state: &AppState, update: Update) {
    let update_id = update.update_id;

    let res = if let Some(cq) = update.callback_query {
        handle_callback(state, cq).await
    } else if let Some(msg) = update.message {
        handle_message(state, msg).await
    } else {
        tracing::debug!(update_id, "update without message, ignored");
        Ok(())
    };

    if let Err(e) = res {
        tracing::warn!(update_id, error = %e, "update handling failed");
    }
}

async fn send(state: &AppState, chat_id: ChatId, text: &str) -> Result<()> {
    state.chat.send_message(chat_id, text, None).await
}

async fn handle_callback(state: &AppState, cq: CallbackQuery) -> Result<()> {
    // ack first so the client stops its spinner even if the work below fails
    if let Err(e) = state.chat.answer_callback(&cq.id, "Elaboro...").await {
        tracing::warn!(callback = %cq.id, error = %e, "callback ack failed");
    }

    let chat_id = cq.message.as_ref().map_or(cq.from.id, |m| m.chat.id);
    let Some(cb) = cq.data.as_deref().and_then(Callback::parse) else {
        tracing::debug!(chat_id, data = ?cq.data, "unknown callback data");
        return Ok(());
    };

    tracing::info!(chat_id, ?cb, "callback");
    match cb {
        Callback::Ai(sym) => ai_commentary(state, chat_id, &sym).await,
        Callback::Select(sym) => analysis_or_missing(state, chat_id, &sym, SELECT_CHART_DAYS, "3 mesi").await,
    }
}

async fn handle_message(state: &AppState, msg: Message) -> Result<()> {
    let chat_id = msg.chat.id;
    let Some(text) = msg.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return Ok(());
    };
    tracing::info!(chat_id, text, "message");

    let cmd = commands::parse(text);
    let leaves_mode = !cmd.is_text();

    // chat mode stays until a command or menu entry; the other modes are one-shot
    let user = state.store.user(chat_id).await;
    let mode = user.as_ref().and_then(|u| u.mode);
    let clears = mode.is_some_and(|m| leaves_mode || m != Mode::Chat);
    if user.is_none() || clears {
        state
            .store
            .update_user(chat_id, |u| {
                if leaves_mode || matches!(u.mode, Some(Mode::Search | Mode::Analysis)) {
                    u.mode = None;
                }
            })
            .await?;
    }

    let name = msg.from.as_ref().and_then(|u| u.username.clone());

    match cmd {
        Command::Text(text) => match mode {
            Some(Mode::Chat) => chat_turn(state, chat_id, &text).await,
            Some(Mode::Search) => search(state, chat_id, &text, "Nessun risultato. Riprova con nome o simbolo diverso.").await,
            Some(Mode::Analysis) => {
                let raw = text.split_whitespace().next().unwrap_or_default();
                match symbol::normalize(raw) {
                    Some(sym) => analysis_or_missing(state, chat_id, &sym, ANALYSIS_DAYS, "6 mesi").await,
                    None => send(state, chat_id, &format!("Simbolo non valido: {}", render::escape(raw))).await,
                }
            }
            None => free_text(state, chat_id, &text).await,
        },
        other => run_command(state, chat_id, name.as_deref(), other).await,
    }
}

async fn run_command(state: &AppState, chat_id: ChatId, name: Option<&str>, cmd: Command) -> Result<()> {
    match cmd {
        Command::Start => {
            let ctx = serde_json::json!({ "name": name });
            let text = render::message_or(state, "welcome", &ctx, "👋 Ciao, sono AngelBot.");
            state
                .chat
                .send_message(chat_id, &text, Some(&keyboards::main_menu()))
                .await
        }
        Command::Help => {
            let text = render::message_or(state, "help", &serde_json::json!({}), "Usa /analizza TICKER o /watch TICKER.");
            send(state, chat_id, &text).await
        }
        Command::Price(sym) => {
            let text = match stocks_service::last_price(state, &sym).await {
                Some(p) => format!("💵 <b>{}</b>: {}$", sym, render::fmt2(p)),
                None => format!("Prezzo non disponibile per {}", sym),
            };
            send(state, chat_id, &text).await
        }
        Command::Analyze(sym) => analysis_or_missing(state, chat_id, &sym, ANALYSIS_DAYS, "6 mesi").await,
        Command::Watch(sym) => {
            let text = if alerts_service::watch(state, chat_id, &sym).await? {
                format!(
                    "✅ {} aggiunto ai preferiti (notifica a ±{}%).",
                    sym, state.settings.notif_pct_default
                )
            } else {
                format!("{} è già nei preferiti.", sym)
            };
            send(state, chat_id, &text).await
        }
        Command::Unwatch(sym) => {
            let text = if alerts_service::unwatch(state, chat_id, &sym).await? {
                format!("🗑️ {} rimosso dai preferiti.", sym)
            } else {
                format!("{} non è nei preferiti.", sym)
            };
            send(state, chat_id, &text).await
        }
        Command::List => list_favorites(state, chat_id).await,
        Command::Notify {
            symbol,
            threshold_pct,
            direction,
            interval_min,
        } => {
            let req = NotifyRequest {
                symbol,
                threshold_pct,
                direction,
                interval_min,
            };
            let entry = alerts_service::set_notification(state, chat_id, req).await?;
            let mut text = format!(
                "🔔 Soglia notifiche per {} impostata a {}% ({})",
                entry.symbol, entry.threshold_pct, entry.direction
            );
            if let Some(m) = entry.interval_min {
                text.push_str(&format!(", al massimo ogni {} min", m));
            }
            send(state, chat_id, &text).await
        }
        Command::Frequency(minutes) => {
            alerts_service::set_frequency(state, chat_id, minutes).await?;
            send(state, chat_id, &format!("⏱️ Intervallo minimo tra notifiche: {} minuti.", minutes)).await
        }
        Command::Report => report_service::send_daily_report(state, chat_id, Utc::now()).await,
        Command::Ask(question) => {
            let text = match commentary_service::answer(state, &question).await {
                Some(answer) => render::escape(&answer),
                None => "AI non configurata. Prova /analizza TICKER.".to_string(),
            };
            send(state, chat_id, &text).await
        }
        Command::Categories => {
            state
                .chat
                .send_message(chat_id, "Scegli categoria:", Some(&keyboards::categories_menu()))
                .await
        }
        Command::Category(button) => {
            let Some(cat) = keyboards::category(button) else {
                return send(state, chat_id, "Nessun simbolo in questa categoria.").await;
            };
            let results: Vec<_> = cat
                .symbols
                .iter()
                .map(|s| crate::services::market::SymbolMatch {
                    symbol: s.to_string(),
                    name: String::new(),
                })
                .collect();
            state
                .chat
                .send_message(
                    chat_id,
                    &format!("Simboli in {}, scegli per analizzare:", cat.name),
                    Some(&keyboards::search_results(&results)),
                )
                .await
        }
        Command::SearchMode => {
            set_mode(state, chat_id, Mode::Search).await?;
            send(state, chat_id, "🔎 Scrivi simbolo o nome (es. AAPL o Apple).").await
        }
        Command::ChatMode => {
            set_mode(state, chat_id, Mode::Chat).await?;
            send(
                state,
                chat_id,
                "🧠 Modalità Chat AI attiva. Parla pure. Usa un comando o il menu per uscire.",
            )
            .await
        }
        Command::AnalysisMode => {
            set_mode(state, chat_id, Mode::Analysis).await?;
            send(
                state,
                chat_id,
                "📊 Inserisci il ticker da analizzare (es. AAPL) o usa /analizza TICKER",
            )
            .await
        }
        Command::Usage(usage) => send(state, chat_id, usage).await,
        Command::Invalid(reason) => send(state, chat_id, &render::escape(&reason)).await,
        Command::UnknownCommand => send(state, chat_id, "Comando non riconosciuto. Usa /help.").await,
        Command::Text(text) => free_text(state, chat_id, &text).await,
    }
}

async fn set_mode(state: &AppState, chat_id: ChatId, mode: Mode) -> Result<()> {
    state
        .store
        .update_user(chat_id, |u| u.mode = Some(mode))
        .await
}

async fn list_favorites(state: &AppState, chat_id: ChatId) -> Result<()> {
    let items: Vec<_> = alerts_service::favorites(state, chat_id)
        .await
        .into_iter()
        .map(|(sym, entry)| {
            serde_json::json!({
                "symbol": sym,
                "threshold": entry.as_ref().map(|e| e.threshold_pct.to_string()),
                "direction": entry.as_ref().map(|e| e.direction.to_string()),
                "baseline": entry.as_ref().and_then(|e| e.baseline()).map(render::fmt2),
            })
        })
        .collect();

    let text = render::message_or(
        state,
        "favorites",
        &serde_json::json!({ "items": items }),
        "Preferiti non disponibili.",
    );
    send(state, chat_id, &text).await
}

/// Analysis message with the AI button, then the chart. False when there is no data.
async fn send_analysis(state: &AppState, chat_id: ChatId, sym: &str, chart_days: i64, label: &str) -> Result<bool> {
    let Some(a) = stocks_service::analyze_symbol(state, sym).await else {
        return Ok(false);
    };

    let fallback = format!("📊 {} {}$", a.symbol, render::fmt2(a.latest));
    let text = render::message_or(state, "analysis", &stocks_service::analysis_ctx(&a), &fallback);
    state
        .chat
        .send_message(chat_id, &text, Some(&keyboards::ai_button(sym)))
        .await?;

    if let Some(png) = stocks_service::chart_png(state, sym, chart_days, label).await {
        state
            .chat
            .send_photo(chat_id, png, &format!("Grafico {} ({})", sym, label))
            .await?;
    }
    Ok(true)
}

async fn analysis_or_missing(state: &AppState, chat_id: ChatId, sym: &str, chart_days: i64, label: &str) -> Result<()> {
    if send_analysis(state, chat_id, sym, chart_days, label).await? {
        return Ok(());
    }
    send(state, chat_id, &format!("⚠️ Dati non disponibili per {}", sym)).await
}

async fn ai_commentary(state: &AppState, chat_id: ChatId, sym: &str) -> Result<()> {
    let Some(a) = stocks_service::analyze_symbol(state, sym).await else {
        return send(state, chat_id, &format!("⚠️ Dati non disponibili per {}", sym)).await;
    };

    let commentary = commentary_service::symbol_commentary(state, &a).await;
    let text = format!(
        "🧠 <b>Analisi AI - {}</b>\n\n{}",
        sym,
        render::escape(&commentary)
    );
    send(state, chat_id, &text).await
}

async fn search(state: &AppState, chat_id: ChatId, query: &str, empty: &str) -> Result<()> {
    let results = stocks_service::search(state, query, SEARCH_LIMIT).await;
    if results.is_empty() {
        return send(state, chat_id, empty).await;
    }

    state
        .chat
        .send_message(
            chat_id,
            &format!("Risultati per <b>{}</b>:", render::escape(query)),
            Some(&keyboards::search_results(&results)),
        )
        .await
}

async fn free_text(state: &AppState, chat_id: ChatId, text: &str) -> Result<()> {
    if !symbol::looks_like_ticker(text) {
        return search(state, chat_id, text, "Nessun risultato. Prova con simbolo o nome differente.").await;
    }

    let first = text.split_whitespace().next().unwrap_or_default();
    if let Some(sym) = symbol::normalize(first) {
        if send_analysis(state, chat_id, &sym, SELECT_CHART_DAYS, "3 mesi").await? {
            return Ok(());
        }
    }

    let results = stocks_service::search(state, text, SEARCH_LIMIT).await;
    if results.is_empty() {
        return send(state, chat_id, "Simbolo non trovato.").await;
    }
    state
        .chat
        .send_message(chat_id, "Forse intendevi:", Some(&keyboards::search_results(&results)))
        .await
}

async fn chat_turn(state: &AppState, chat_id: ChatId, text: &str) -> Result<()> {
    let now = Utc::now().timestamp();

    let context = state
        .store
        .update_user(chat_id, |u| {
            u.push_turn("user", text, now);
            u.context.clone()
        })
        .await?;

    let reply = commentary_service::chat_reply(state, &context).await;

    state
        .store
        .update_user(chat_id, |u| u.push_turn("assistant", &reply, Utc::now().timestamp()))
        .await?;

    send(state, chat_id, &render::escape(&reply)).await
}
