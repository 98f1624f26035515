use std::sync::Arc;

use handlebars::Handlebars;

use crate::error::Result;

pub type Hbs = Arc<Handlebars<'static>>;

const TEMPLATES: &[(&str, &str)] = &[
    ("welcome", include_str!("../../templates/welcome.hbs")),
    ("help", include_str!("../../templates/help.hbs")),
    ("analysis", include_str!("../../templates/analysis.hbs")),
    ("alert", include_str!("../../templates/alert.hbs")),
    ("favorites", include_str!("../../templates/favorites.hbs")),
    ("daily_report", include_str!("../../templates/daily_report.hbs")),
];

/// Message templates, compiled into the binary. Output is HTML-escaped for
/// Telegram's HTML parse mode.
pub fn build_handlebars() -> Result<Hbs> {
    let mut hb = Handlebars::new();

    for (name, source) in TEMPLATES {
        hb.register_template_string(name, *source)?;
    }

    Ok(Arc::new(hb))
}
