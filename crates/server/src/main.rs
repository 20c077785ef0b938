mod bootstrap;

use anyhow::Result;
use pricebot_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use pricebot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // a missing .env is fine; the token may come from the real environment
    let _ = dotenvy::dotenv();

    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "Bot is now running. Press CTRL+C to exit."
    );
    app.session.run_until(&app.dispatcher, wait_for_shutdown()).await?;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "pricebot-server stopped"
    );

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_error",
            error = %error,
            "could not listen for ctrl-c; running until the session ends"
        );
        std::future::pending::<()>().await;
    }
}
