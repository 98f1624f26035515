use std::sync::LazyLock;

use regex::Regex;

// Exchange-prefixed and suffixed tickers: AAPL, ENI.MI, BINANCE:BTCUSDT, EURUSD=X, ^GSPC
static SYMBOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9^][A-Z0-9.\-=:_]{0,23}$").expect("symbol regex"));

/// Trimmed, upper-cased symbol, or None if it cannot be a ticker.
pub fn normalize(raw: &str) -> Option<String> {
    let sym = raw.trim().to_uppercase();
    SYMBOL_RE.is_match(&sym).then_some(sym)
}

/// Heuristic for free text: short all-caps words or anything containing a digit.
pub fn looks_like_ticker(text: &str) -> bool {
    let t = text.trim();
    let has_cased = t.chars().any(|c| c.is_alphabetic());
    let all_upper = has_cased && !t.chars().any(|c| c.is_lowercase());
    (t.chars().count() <= 6 && all_upper) || t.chars().any(|c| c.is_ascii_digit())
}
