use std::sync::Arc;

use pricebot_core::{
    config::{AppConfig, ConfigError, LoadOptions},
    lookup::{HttpPriceApi, PriceLookupService},
    UpstreamError,
};
use pricebot_discord::{
    events::{price_bot_dispatcher, BotIdentity, EventDispatcher},
    gateway::SerenityGateway,
    session::Session,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: EventDispatcher,
    pub session: Session,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("price api client setup failed: {0}")]
    PriceApi(#[source] UpstreamError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let price_api = HttpPriceApi::new(&config.price_api).map_err(BootstrapError::PriceApi)?;
    info!(
        event_name = "system.bootstrap.price_api_ready",
        correlation_id = "bootstrap",
        endpoint = %price_api.endpoint(),
        timeout_secs = config.price_api.timeout_secs,
        "price api client configured"
    );

    let dispatcher = price_bot_dispatcher(
        PriceLookupService::new(price_api),
        BotIdentity::default(),
        config.discord.command_prefix,
    );

    let gateway = Arc::new(SerenityGateway::new(config.discord.token.clone()));
    let session = Session::new(gateway.clone(), gateway);

    Ok(Application { config, dispatcher, session })
}
