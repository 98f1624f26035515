use serde::Serialize;

use crate::{AppState, error::Result};

pub fn fmt2(x: f64) -> String {
    format!("{:.2}", x)
}

pub fn fmt_opt(x: Option<f64>) -> String {
    x.map(fmt2).unwrap_or_else(|| "N/D".to_string())
}

/// Escapes user or AI text before it goes into an HTML message.
pub fn escape(text: &str) -> String {
    handlebars::html_escape(text)
}

pub fn message<T: Serialize>(state: &AppState, template: &str, ctx: &T) -> Result<String> {
    let out = state.hbs.render(template, ctx)?;
    Ok(out.trim().to_string())
}

/// Renders `template`, or returns `fallback` after logging the failure.
pub fn message_or<T: Serialize>(state: &AppState, template: &str, ctx: &T, fallback: &str) -> String {
    match message(state, template, ctx) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(template, error = %e, "template render failed");
            fallback.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_two_decimals() {
        assert_eq!(fmt2(3.14159), "3.14");
        assert_eq!(fmt_opt(None), "N/D");
        assert_eq!(fmt_opt(Some(2.0)), "2.00");
    }

    #[test]
    fn escapes_html() {
        assert_eq!(escape("<b>&</b>"), "&lt;b&gt;&amp;&lt;/b&gt;");
    }
}
