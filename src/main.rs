use anyhow::{Context as _, Result};
use log::info;
use serenity::all::Client;
use std::env;

use streamherald::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables and initialize logging
    dotenv::dotenv().ok();
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Stream Herald v{}", streamherald::VERSION);

    let config_path = env::var("STREAMHERALD_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config = ConfigHandle::load(&config_path).await?;

    // DISCORD_TOKEN overrides the token in config.json for local runs.
    let token = match env::var("DISCORD_TOKEN") {
        Ok(token) => token,
        Err(_) => config.get().await.discord.key.clone(),
    };

    let handler = RelayHandler::new(config, reqwest::Client::new());
    let mut client = Client::builder(&token, RelayHandler::intents())
        .event_handler(handler)
        .await
        .context("failed to build Discord client")?;

    client.start().await.context("Discord client error")?;
    Ok(())
}
