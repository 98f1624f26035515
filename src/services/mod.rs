pub mod finnhub;
pub mod market;
pub mod openai;
pub mod telegram;

pub mod store;

pub mod alert_monitor;
pub mod alerts_service;
pub mod analysis;
pub mod chart;
pub mod commentary_service;
pub mod report_service;
pub mod stocks_service;
