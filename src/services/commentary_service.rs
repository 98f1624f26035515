use crate::{AppState, models::ChatTurn, render};

use super::{analysis::Analysis, openai::ChatMessage};

const ANALYST: &str = "Sei un analista finanziario esperto.";
const ADVISOR: &str = "Sei un consulente finanziario esperto che risponde in italiano.";
const CHAT_PERSONA: &str =
    "Sei AngelBot, analista finanziario che risponde in italiano in modo chiaro e prudente.";

pub const CHAT_FALLBACK: &str =
    "Ricevuto. Posso fare analisi con /analizza TICKER o ricerca con 🔍 Cerca.";

async fn complete(
    state: &AppState,
    messages: &[ChatMessage],
    max_tokens: u32,
    temperature: f32,
) -> Option<String> {
    if !state.ai.is_configured() {
        return None;
    }

    match state.ai.complete(messages, max_tokens, temperature).await {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(error = %e, "AI completion failed");
            None
        }
    }
}

/// Short commentary on one symbol; deterministic text when AI is unavailable.
pub async fn symbol_commentary(state: &AppState, a: &Analysis) -> String {
    let f = &a.fundamentals;
    let prompt = format!(
        "Sei un analista finanziario che parla italiano. Commenta in modo sintetico {sym} \
         con queste informazioni: trend {trend}, SMA50 {ma50:.2}, SMA200 {ma200:.2}, \
         variazione recente {pct:.2}%, fondamentali P/E={pe}, EPS={eps}. \
         Fornisci 3 punti: situazione, rischio principale, indicatore da monitorare. \
         Termina con frase indicativa (non consulenza).",
        sym = a.symbol,
        trend = a.trend.kind.label(),
        ma50 = a.trend.ma50,
        ma200 = a.trend.ma200,
        pct = a.pct_period,
        pe = render::fmt_opt(f.pe),
        eps = render::fmt_opt(f.eps),
    );

    let messages = [ChatMessage::system(ANALYST), ChatMessage::user(prompt)];
    if let Some(text) = complete(state, &messages, 300, 0.3).await {
        return text;
    }

    format!(
        "{} trend {}. Variazione recente {:.2}%. Monitorare SMA50/SMA200 e RSI.",
        a.symbol,
        a.trend.kind.label(),
        a.pct_period
    )
}

/// Reply for the AI chat mode, given the stored conversation.
pub async fn chat_reply(state: &AppState, context: &[ChatTurn]) -> String {
    let mut messages = vec![ChatMessage::system(CHAT_PERSONA)];
    messages.extend(context.iter().map(|t| ChatMessage {
        role: t.role.clone(),
        content: t.content.clone(),
    }));

    complete(state, &messages, 300, 0.3)
        .await
        .unwrap_or_else(|| CHAT_FALLBACK.to_string())
}

/// One-shot question; None when AI is not configured.
pub async fn answer(state: &AppState, question: &str) -> Option<String> {
    if !state.ai.is_configured() {
        return None;
    }
    let messages = [ChatMessage::system(ADVISOR), ChatMessage::user(question)];
    Some(
        complete(state, &messages, 500, 0.7)
            .await
            .unwrap_or_else(|| "Errore nella generazione della risposta AI.".to_string()),
    )
}

/// Prudent comment on the top symbols of the daily report.
pub async fn daily_comment(state: &AppState, top: &[&Analysis]) -> Option<String> {
    if top.is_empty() {
        return None;
    }

    let mut prompt =
        String::from("Sei un analista. Dai un commento sintetico e prudente per questi titoli:\n");
    for a in top {
        let rsi = a
            .rsi
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "N/D".to_string());
        prompt.push_str(&format!(
            "{}: price {:.2}, trend {}, RSI {}\n",
            a.symbol,
            a.latest,
            a.trend.kind.label(),
            rsi
        ));
    }

    let messages = [ChatMessage::system(ANALYST), ChatMessage::user(prompt)];
    complete(state, &messages, 220, 0.35).await
}
