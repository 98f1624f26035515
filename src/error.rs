use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} request failed: {status} {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("no data for {0}")]
    NoData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template error: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("render error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("chart error: {0}")]
    Chart(String),

    #[error("data file {path} is unreadable ({reason}), refusing to overwrite it")]
    Store { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, BotError>;
