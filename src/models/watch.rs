use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    Both,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" | "su" | "above" => Some(Self::Up),
            "down" | "giu" | "giù" | "below" => Some(Self::Down),
            "both" | "entrambi" => Some(Self::Both),
            _ => None,
        }
    }

    /// Whether `change_pct` is past `threshold_pct` in this direction.
    pub fn crossed(self, change_pct: f64, threshold_pct: f64) -> bool {
        match self {
            Self::Up => change_pct >= threshold_pct,
            Self::Down => change_pct <= -threshold_pct,
            Self::Both => change_pct.abs() >= threshold_pct,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub symbol: String,

    // set on first observation, reset every time an alert fires
    #[serde(default)]
    pub baseline_price: Option<f64>,

    pub threshold_pct: f64,

    #[serde(default)]
    pub direction: Direction,

    // overrides the per-user / global debounce window
    #[serde(default)]
    pub interval_min: Option<u32>,

    // unix seconds
    #[serde(default)]
    pub last_notified_at: Option<i64>,
}

impl WatchEntry {
    pub fn new(symbol: &str, threshold_pct: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            baseline_price: None,
            threshold_pct,
            direction: Direction::Both,
            interval_min: None,
            last_notified_at: None,
        }
    }

    /// The usable baseline. Zero, negative and non-finite values count as missing.
    pub fn baseline(&self) -> Option<f64> {
        self.baseline_price.filter(|b| b.is_finite() && *b > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_thresholds() {
        assert!(Direction::Both.crossed(6.0, 5.0));
        assert!(Direction::Both.crossed(-5.0, 5.0));
        assert!(!Direction::Both.crossed(3.0, 5.0));

        assert!(Direction::Up.crossed(5.5, 5.0));
        assert!(!Direction::Up.crossed(-9.0, 5.0));

        assert!(Direction::Down.crossed(-5.5, 5.0));
        assert!(!Direction::Down.crossed(9.0, 5.0));
    }

    #[test]
    fn direction_parse_accepts_aliases() {
        assert_eq!(Direction::parse("UP"), Some(Direction::Up));
        assert_eq!(Direction::parse("giù"), Some(Direction::Down));
        assert_eq!(Direction::parse("both"), Some(Direction::Both));
        assert_eq!(Direction::parse("sideways"), None);
    }

    #[test]
    fn zero_baseline_counts_as_missing() {
        let mut e = WatchEntry::new("AAPL", 2.0);
        e.baseline_price = Some(0.0);
        assert_eq!(e.baseline(), None);
        e.baseline_price = Some(f64::NAN);
        assert_eq!(e.baseline(), None);
        e.baseline_price = Some(101.5);
        assert_eq!(e.baseline(), Some(101.5));
    }

    #[test]
    fn old_entries_without_optional_fields_still_load() {
        let raw = r#"{ "symbol": "TSLA", "threshold_pct": 3.5 }"#;
        let e: WatchEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(e.direction, Direction::Both);
        assert_eq!(e.baseline_price, None);
        assert_eq!(e.last_notified_at, None);
    }
}
