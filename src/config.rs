use std::{env, path::PathBuf, str::FromStr};

use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,

    pub telegram_token: String,
    pub telegram_api_base: String,
    // public base url; when set the bot registers `<url>/webhook` on startup
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,

    pub finnhub_api_key: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,

    pub data_file: PathBuf,

    pub alert_poll_secs: u64,
    pub notify_interval_min: u32,
    pub notif_pct_default: f64,
    pub chart_on_alert: bool,

    pub daily_report_hour: u32,
    pub report_tz: Tz,

    pub http_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            telegram_token: String::new(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            webhook_url: None,
            webhook_secret: None,
            finnhub_api_key: String::new(),
            openai_api_key: String::new(),
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            data_file: PathBuf::from("users.json"),
            alert_poll_secs: 20,
            notify_interval_min: 15,
            notif_pct_default: 2.0,
            chart_on_alert: true,
            daily_report_hour: 9,
            report_tz: chrono_tz::Europe::Rome,
            http_timeout_secs: 20,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.parse::<T>().unwrap_or_else(|_| {
            tracing::warn!("{key}={raw:?} is not valid, using default");
            default
        }),
        None => default,
    }
}

fn flag(key: &str, default: bool) -> bool {
    match var(key).map(|v| v.to_ascii_lowercase()) {
        Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let d = Settings::default();

    let report_tz = match var("REPORT_TZ") {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!("unknown REPORT_TZ {name:?}, using {}", d.report_tz);
            d.report_tz
        }),
        None => d.report_tz,
    };

    Settings {
        host: var("HOST").unwrap_or(d.host),
        port: parsed("PORT", d.port),
        telegram_token: var("TELEGRAM_TOKEN").unwrap_or_default(),
        telegram_api_base: var("TELEGRAM_API_BASE").unwrap_or(d.telegram_api_base),
        webhook_url: var("WEBHOOK_URL").map(|u| u.trim_end_matches('/').to_string()),
        webhook_secret: var("WEBHOOK_SECRET"),
        finnhub_api_key: var("FINNHUB_API_KEY").unwrap_or_default(),
        openai_api_key: var("OPENAI_API_KEY").unwrap_or_default(),
        openai_model: var("OPENAI_MODEL").unwrap_or(d.openai_model),
        openai_base_url: var("OPENAI_BASE_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(d.openai_base_url),
        data_file: var("DATA_FILE").map(PathBuf::from).unwrap_or(d.data_file),
        alert_poll_secs: parsed("ALERT_POLL_SECS", d.alert_poll_secs).max(1),
        notify_interval_min: parsed("NOTIFY_INTERVAL_MIN", d.notify_interval_min),
        notif_pct_default: parsed("NOTIF_PCT_DEFAULT", d.notif_pct_default),
        chart_on_alert: flag("CHART_ON_ALERT", d.chart_on_alert),
        daily_report_hour: parsed("DAILY_REPORT_HOUR", d.daily_report_hour).min(23),
        report_tz,
        http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", d.http_timeout_secs),
    }
}
