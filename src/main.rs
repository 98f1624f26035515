use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::EnvFilter;

use angelbot::{
    AppState, bot, config, routes,
    services::{
        alert_monitor, finnhub::FinnhubClient, openai::OpenAiClient, store::JsonStore,
        telegram::TelegramClient,
    },
    templates,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("angelbot=info,tower_http=info")),
        )
        .init();

    let settings = config::load();
    let timeout = settings.http_timeout_secs;

    if settings.telegram_token.is_empty() {
        tracing::warn!("TELEGRAM_TOKEN not set, outgoing messages will fail");
    }
    if settings.finnhub_api_key.is_empty() {
        tracing::warn!("FINNHUB_API_KEY not set, market data unavailable");
    }

    let telegram = Arc::new(TelegramClient::new(
        &settings.telegram_api_base,
        &settings.telegram_token,
        timeout,
    ));

    let state = AppState {
        hbs: templates::build_handlebars()?,
        store: Arc::new(JsonStore::new(settings.data_file.clone())),
        market: Arc::new(FinnhubClient::new(settings.finnhub_api_key.clone(), timeout)),
        chat: telegram.clone(),
        ai: Arc::new(OpenAiClient::new(
            &settings.openai_base_url,
            settings.openai_api_key.clone(),
            settings.openai_model.clone(),
            timeout,
        )),
        settings: settings.clone(),
    };

    if let Some(url) = &settings.webhook_url {
        let hook = format!("{}/webhook", url);
        match telegram
            .set_webhook(&hook, settings.webhook_secret.as_deref())
            .await
        {
            Ok(()) => tracing::info!(%hook, "webhook registered"),
            Err(e) => tracing::error!(%hook, error = %e, "webhook registration failed"),
        }
        if let Err(e) = telegram.set_my_commands(&bot::keyboards::bot_commands()).await {
            tracing::warn!(error = %e, "setMyCommands failed");
        }
    }

    let monitor = alert_monitor::spawn_price_alert_monitor(state.clone());

    let app = routes::app(state);

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>()?, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    monitor.abort();
    Ok(())
}
