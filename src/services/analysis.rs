//! Technical indicators over daily closes and the per-symbol summary built from them.

use serde::Serialize;

use super::market::Fundamentals;

/// Rolling mean with a minimum of one observation.
pub fn sma(series: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(series.len());
    let mut sum = 0.0;
    for (i, x) in series.iter().enumerate() {
        sum += x;
        if i >= window {
            sum -= series[i - window];
        }
        out.push(sum / (i + 1).min(window) as f64);
    }
    out
}

/// Exponential moving average seeded with the first value (`adjust = false`).
pub fn ema(series: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(series.len());
    for (i, x) in series.iter().enumerate() {
        let next = if i == 0 {
            *x
        } else {
            alpha * x + (1.0 - alpha) * out[i - 1]
        };
        out.push(next);
    }
    out
}

/// RSI at the last close, averaging gains and losses over the trailing `period` closes.
pub fn rsi_last(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < 2 || period == 0 {
        return None;
    }
    let start = closes.len().saturating_sub(period).max(1);
    let deltas: Vec<f64> = (start..closes.len())
        .map(|i| closes[i] - closes[i - 1])
        .collect();
    let n = deltas.len() as f64;
    let up = deltas.iter().map(|d| d.max(0.0)).sum::<f64>() / n;
    let down = deltas.iter().map(|d| (-d).max(0.0)).sum::<f64>() / n;
    let rs = up / (down + 1e-9);
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD(12, 26, 9) histogram at the last close.
pub fn macd_hist_last(closes: &[f64]) -> Option<f64> {
    if closes.is_empty() {
        return None;
    }
    let fast = ema(closes, 12);
    let slow = ema(closes, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, 9);
    Some(line[line.len() - 1] - signal[signal.len() - 1])
}

/// Sample std-dev of the last `window` percentage changes, in percent.
pub fn volatility_pct(closes: &[f64], window: usize) -> f64 {
    let changes: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if window < 2 || changes.len() < window {
        return 0.0;
    }
    let tail = &changes[changes.len() - window..];
    let mean = tail.iter().sum::<f64>() / window as f64;
    let var = tail.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
    var.sqrt() * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    Rialzista,
    Ribassista,
    Neutrale,
}

impl TrendKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Rialzista => "rialzista",
            Self::Ribassista => "ribassista",
            Self::Neutrale => "neutrale",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Trend {
    pub ma50: f64,
    pub ma200: f64,
    pub kind: TrendKind,
}

/// SMA50 against SMA200 with a 1% dead band.
pub fn detect_trend(closes: &[f64]) -> Option<Trend> {
    let ma50 = *sma(closes, 50).last()?;
    let ma200 = *sma(closes, 200).last()?;
    let kind = if ma50 > ma200 * 1.01 {
        TrendKind::Rialzista
    } else if ma50 < ma200 * 0.99 {
        TrendKind::Ribassista
    } else {
        TrendKind::Neutrale
    };
    Some(Trend { ma50, ma200, kind })
}

#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub symbol: String,
    pub latest: f64,
    pub pct_period: f64,
    pub rsi: Option<f64>,
    pub macd_hist: Option<f64>,
    pub vol7_pct: f64,
    pub vol30_pct: f64,
    pub trend: Trend,
    pub signals: Vec<String>,
    pub fundamentals: Fundamentals,
}

pub fn analyze(symbol: &str, closes: &[f64], fundamentals: Fundamentals) -> Option<Analysis> {
    let latest = *closes.last()?;
    let first = closes[0];
    if first == 0.0 {
        return None;
    }

    let rsi = (closes.len() >= 14).then(|| rsi_last(closes, 14)).flatten();

    let mut signals = Vec::new();
    match rsi {
        Some(r) if r < 30.0 => signals.push("IPERVENDUTO (RSI<30)".to_string()),
        Some(r) if r > 70.0 => signals.push("IPERCOMPRATO (RSI>70)".to_string()),
        _ => {}
    }

    Some(Analysis {
        symbol: symbol.to_string(),
        latest,
        pct_period: (latest - first) / first * 100.0,
        rsi,
        macd_hist: macd_hist_last(closes),
        vol7_pct: volatility_pct(closes, 7),
        vol30_pct: volatility_pct(closes, 30),
        trend: detect_trend(closes)?,
        signals,
        fundamentals,
    })
}

/// Ranking used by the daily report.
pub fn report_score(a: &Analysis) -> f64 {
    let mut score = 0.0;
    match a.rsi {
        Some(r) if r < 35.0 => score += 1.5,
        Some(r) if r > 70.0 => score -= 1.5,
        _ => {}
    }
    match a.trend.kind {
        TrendKind::Rialzista => score += 1.2,
        TrendKind::Ribassista => score -= 1.2,
        TrendKind::Neutrale => {}
    }
    score + a.pct_period / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn sma_uses_partial_windows_at_start() {
        let s = sma(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(s, vec![1.0, 1.5, 2.5, 3.5]);
    }

    #[test]
    fn ema_is_seeded_with_first_value() {
        let e = ema(&[10.0, 20.0], 3);
        assert!(approx(e[0], 10.0));
        assert!(approx(e[1], 15.0));
    }

    #[test]
    fn rsi_is_high_on_steady_gains() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let r = rsi_last(&closes, 14).unwrap();
        assert!(r > 99.0);
    }

    #[test]
    fn rsi_is_low_on_steady_losses() {
        let closes: Vec<f64> = (1..=20).rev().map(|i| i as f64).collect();
        let r = rsi_last(&closes, 14).unwrap();
        assert!(r < 1.0);
    }

    #[test]
    fn flat_series_has_no_volatility_and_neutral_trend() {
        let closes = vec![50.0; 60];
        assert_eq!(volatility_pct(&closes, 7), 0.0);
        assert_eq!(detect_trend(&closes).unwrap().kind, TrendKind::Neutrale);
    }

    #[test]
    fn volatility_needs_enough_changes() {
        assert_eq!(volatility_pct(&[1.0, 2.0, 3.0], 7), 0.0);
    }

    #[test]
    fn rising_series_is_bullish_and_scores_up() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let a = analyze("AAPL", &closes, Fundamentals::default()).unwrap();
        assert_eq!(a.trend.kind, TrendKind::Rialzista);
        assert!(approx(a.pct_period, 119.0));
        assert!(a.signals.iter().any(|s| s.starts_with("IPERCOMPRATO")));
        // bullish trend, overbought RSI, +119%
        assert!(approx(report_score(&a), 1.2 - 1.5 + 1.19));
    }

    #[test]
    fn empty_or_zero_series_is_rejected() {
        assert!(analyze("X", &[], Fundamentals::default()).is_none());
        assert!(analyze("X", &[0.0, 1.0], Fundamentals::default()).is_none());
    }
}
