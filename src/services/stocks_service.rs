use crate::{AppState, render};

use super::{
    analysis::{self, Analysis},
    chart,
    market::{Fundamentals, SymbolMatch},
};

// about six months of daily closes
pub const ANALYSIS_DAYS: i64 = 183;

pub async fn last_price(state: &AppState, symbol: &str) -> Option<f64> {
    match state.market.quote(symbol).await {
        Ok(q) if q.price.is_finite() && q.price > 0.0 => Some(q.price),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(symbol, error = %e, "quote unavailable");
            None
        }
    }
}

/// Provider search; a failing provider degrades to the raw query as a symbol.
pub async fn search(state: &AppState, query: &str, limit: usize) -> Vec<SymbolMatch> {
    let q = query.trim();
    if q.is_empty() {
        return Vec::new();
    }

    match state.market.search(q, limit).await {
        Ok(results) => results,
        Err(e) => {
            tracing::warn!(query = q, error = %e, "search unavailable");
            vec![SymbolMatch {
                symbol: q.to_uppercase(),
                name: q.to_string(),
            }]
        }
    }
}

pub async fn analyze_symbol(state: &AppState, symbol: &str) -> Option<Analysis> {
    let candles = match state.market.daily_closes(symbol, ANALYSIS_DAYS).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(symbol, error = %e, "history unavailable");
            return None;
        }
    };

    let fundamentals = state
        .market
        .fundamentals(symbol)
        .await
        .unwrap_or_else(|e| {
            tracing::debug!(symbol, error = %e, "fundamentals unavailable");
            Fundamentals::default()
        });

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    analysis::analyze(symbol, &closes, fundamentals)
}

/// Chart for the last `days` days, or None when data or rendering fails.
pub async fn chart_png(state: &AppState, symbol: &str, days: i64, label: &str) -> Option<Vec<u8>> {
    let candles = match state.market.daily_closes(symbol, days).await {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(symbol, error = %e, "history unavailable for chart");
            return None;
        }
    };

    let (sym, label) = (symbol.to_string(), label.to_string());
    let rendered =
        tokio::task::spawn_blocking(move || chart::render_png(&sym, &label, &candles)).await;

    match rendered {
        Ok(Ok(png)) => Some(png),
        Ok(Err(e)) => {
            tracing::warn!(symbol, error = %e, "chart rendering failed");
            None
        }
        Err(e) => {
            tracing::error!(symbol, error = %e, "chart task panicked");
            None
        }
    }
}

/// Template context for the `analysis` message.
pub fn analysis_ctx(a: &Analysis) -> serde_json::Value {
    let f = &a.fundamentals;
    let fundamentals = (!f.is_empty()).then(|| {
        serde_json::json!({
            "pe": render::fmt_opt(f.pe),
            "eps": render::fmt_opt(f.eps),
            "market_cap": f
                .market_cap
                .map(|mc| format!("{:.0}", mc))
                .unwrap_or_else(|| "N/D".to_string()),
        })
    });

    serde_json::json!({
        "symbol": a.symbol,
        "latest": render::fmt2(a.latest),
        "pct_period": format!("{:+.2}", a.pct_period),
        "rsi": a.rsi.map(render::fmt2),
        "trend": a.trend.kind.label(),
        "ma50": render::fmt2(a.trend.ma50),
        "ma200": render::fmt2(a.trend.ma200),
        "vol7": render::fmt2(a.vol7_pct),
        "vol30": render::fmt2(a.vol30_pct),
        "signals": (!a.signals.is_empty()).then(|| a.signals.join(", ")),
        "fundamentals": fundamentals,
    })
}
