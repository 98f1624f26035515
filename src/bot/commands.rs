//! Text and callback parsing. No I/O here; the dispatcher acts on the result.

use crate::{
    models::{Direction, symbol},
    services::alerts_service::MAX_INTERVAL_MIN,
};

use super::keyboards;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Help,
    Price(String),
    Analyze(String),
    Watch(String),
    Unwatch(String),
    List,
    Notify {
        symbol: String,
        threshold_pct: f64,
        direction: Option<Direction>,
        interval_min: Option<u32>,
    },
    Frequency(u32),
    Report,
    Ask(String),

    // reply keyboard entries
    Categories,
    Category(&'static str),
    SearchMode,
    ChatMode,
    AnalysisMode,

    // missing arguments, carries the usage line
    Usage(&'static str),
    // arguments present but not acceptable
    Invalid(String),
    UnknownCommand,
    Text(String),
}

impl Command {
    /// Commands and menu entries leave chat mode; free text keeps it.
    pub fn is_text(&self) -> bool {
        matches!(self, Command::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Callback {
    Ai(String),
    Select(String),
}

impl Callback {
    pub fn parse(data: &str) -> Option<Self> {
        let (kind, sym) = data.split_once('|')?;
        let sym = symbol::normalize(sym)?;
        match kind {
            "AI" => Some(Callback::Ai(sym)),
            "SEL" => Some(Callback::Select(sym)),
            _ => None,
        }
    }
}

fn symbol_arg(arg: Option<&str>, usage: &'static str, ctor: fn(String) -> Command) -> Command {
    match arg {
        None => Command::Usage(usage),
        Some(raw) => match symbol::normalize(raw) {
            Some(sym) => ctor(sym),
            None => Command::Invalid(format!("Simbolo non valido: {}", raw)),
        },
    }
}

fn parse_notify(args: &[&str]) -> Command {
    const USAGE: &str = "Uso: /notify TICKER PCT [up|down|both] [MINUTI]";

    let (Some(raw_sym), Some(raw_pct)) = (args.first(), args.get(1)) else {
        return Command::Usage(USAGE);
    };
    let Some(symbol) = symbol::normalize(raw_sym) else {
        return Command::Invalid(format!("Simbolo non valido: {}", raw_sym));
    };

    let threshold_pct = match raw_pct.trim_end_matches('%').replace(',', ".").parse::<f64>() {
        Ok(p) if p.is_finite() && p > 0.0 => p,
        _ => return Command::Invalid("Formato soglia non valido.".to_string()),
    };

    let mut direction = None;
    let mut interval_min = None;
    for arg in &args[2..] {
        if let Some(d) = Direction::parse(arg) {
            direction = Some(d);
        } else if let Ok(m) = arg.parse::<u32>() {
            if !(1..=MAX_INTERVAL_MIN).contains(&m) {
                return Command::Invalid(format!(
                    "Intervallo non valido: usa da 1 a {} minuti.",
                    MAX_INTERVAL_MIN
                ));
            }
            interval_min = Some(m);
        } else {
            return Command::Usage(USAGE);
        }
    }

    Command::Notify {
        symbol,
        threshold_pct,
        direction,
        interval_min,
    }
}

fn parse_frequency(arg: Option<&str>) -> Command {
    match arg.map(str::parse::<u32>) {
        None => Command::Usage("Uso: /frequenza MINUTI"),
        Some(Ok(m)) if (1..=MAX_INTERVAL_MIN).contains(&m) => Command::Frequency(m),
        Some(_) => Command::Invalid(format!(
            "Frequenza non valida: usa da 1 a {} minuti.",
            MAX_INTERVAL_MIN
        )),
    }
}

pub fn parse(text: &str) -> Command {
    let text = text.trim();

    match text {
        keyboards::HOME => return Command::Start,
        keyboards::CATEGORIES_BUTTON => return Command::Categories,
        keyboards::SEARCH => return Command::SearchMode,
        keyboards::CHAT => return Command::ChatMode,
        keyboards::ANALYSIS => return Command::AnalysisMode,
        keyboards::FAVORITES => return Command::List,
        keyboards::REPORT => return Command::Report,
        _ => {}
    }
    if let Some(cat) = keyboards::category(text) {
        return Command::Category(cat.button);
    }

    let Some(rest) = text.strip_prefix('/') else {
        return Command::Text(text.to_string());
    };

    let mut parts = rest.split_whitespace();
    let head = parts.next().unwrap_or_default();
    // "/watch@AngelBot AAPL" in groups
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
    let args: Vec<&str> = parts.collect();
    let first = args.first().copied();

    match name.as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "prezzo" | "price" => symbol_arg(first, "Uso: /prezzo TICKER", Command::Price),
        "analizza" => symbol_arg(first, "Uso: /analizza TICKER", Command::Analyze),
        "watch" => symbol_arg(first, "Uso: /watch TICKER", Command::Watch),
        "unwatch" => symbol_arg(first, "Uso: /unwatch TICKER", Command::Unwatch),
        "list" => Command::List,
        "notify" => parse_notify(&args),
        "frequenza" => parse_frequency(first),
        "report" => Command::Report,
        "ai" if args.is_empty() => Command::Usage("Uso: /ai DOMANDA"),
        "ai" => Command::Ask(args.join(" ")),
        _ => Command::UnknownCommand,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_symbol_commands() {
        assert_eq!(parse("/watch aapl"), Command::Watch("AAPL".into()));
        assert_eq!(parse("/analizza@AngelBot eni.mi"), Command::Analyze("ENI.MI".into()));
        assert_eq!(parse("/watch"), Command::Usage("Uso: /watch TICKER"));
        assert!(matches!(parse("/prezzo <b>"), Command::Invalid(_)));
    }

    #[test]
    fn parses_notify() {
        assert_eq!(
            parse("/notify tsla 3.5 down 30"),
            Command::Notify {
                symbol: "TSLA".into(),
                threshold_pct: 3.5,
                direction: Some(Direction::Down),
                interval_min: Some(30),
            }
        );
        assert_eq!(
            parse("/notify AAPL 2"),
            Command::Notify {
                symbol: "AAPL".into(),
                threshold_pct: 2.0,
                direction: None,
                interval_min: None,
            }
        );
    }

    #[test]
    fn rejects_bad_thresholds() {
        assert!(matches!(parse("/notify AAPL abc"), Command::Invalid(_)));
        assert!(matches!(parse("/notify AAPL 0"), Command::Invalid(_)));
        assert!(matches!(parse("/notify AAPL -5"), Command::Invalid(_)));
        assert!(matches!(parse("/notify AAPL NaN"), Command::Invalid(_)));
        assert!(matches!(parse("/notify AAPL"), Command::Usage(_)));
    }

    #[test]
    fn frequency_bounds() {
        assert_eq!(parse("/frequenza 30"), Command::Frequency(30));
        assert!(matches!(parse("/frequenza 0"), Command::Invalid(_)));
        assert!(matches!(parse("/frequenza 1441"), Command::Invalid(_)));
    }

    #[test]
    fn menu_entries_and_text() {
        assert_eq!(parse("🏠 Menu principale"), Command::Start);
        assert_eq!(parse("⭐ Preferiti"), Command::List);
        assert_eq!(parse("💬 Chat AI"), Command::ChatMode);
        assert_eq!(parse("ciao"), Command::Text("ciao".into()));
        assert_eq!(parse("/boh"), Command::UnknownCommand);
        assert!(!parse("/list").is_text());
    }

    #[test]
    fn parses_callbacks() {
        assert_eq!(Callback::parse("AI|aapl"), Some(Callback::Ai("AAPL".into())));
        assert_eq!(Callback::parse("SEL|0700.HK"), Some(Callback::Select("0700.HK".into())));
        assert_eq!(Callback::parse("XYZ|AAPL"), None);
        assert_eq!(Callback::parse("AI"), None);
    }
}
