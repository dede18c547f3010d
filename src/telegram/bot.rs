//! Bot instance creation and command registration.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::BotCommand;

use crate::conversation::dispatcher::{
    CREATE_COMMAND, RESTART_COMMAND, SEARCH_COMMAND, START_COMMAND,
};
use crate::core::config;

/// Creates a Bot instance from `BOT_TOKEN`, honoring a custom Bot API URL.
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;

    let bot = if let Ok(bot_api_url) = std::env::var("BOT_API_URL") {
        log::info!("Using custom Bot API URL: {bot_api_url}");
        let url = url::Url::parse(&bot_api_url)
            .map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {e}"))?;
        Bot::from_env_with_client(client).set_api_url(url)
    } else {
        Bot::from_env_with_client(client)
    };

    Ok(bot)
}

/// Registers the command list shown in the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new(START_COMMAND.trim_start_matches('/'), "show the action menu"),
        BotCommand::new(SEARCH_COMMAND.trim_start_matches('/'), "search feedback"),
        BotCommand::new(CREATE_COMMAND.trim_start_matches('/'), "create a feedback"),
        BotCommand::new(RESTART_COMMAND.trim_start_matches('/'), "reset everything"),
    ])
    .await?;

    Ok(())
}
