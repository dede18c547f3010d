use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

use feedbot::conversation::dispatcher::ChannelDispatcher;
use feedbot::core::config;
use feedbot::parsers::ParserRegistry;
use feedbot::search::blackbox::BlackboxSearchProvider;
use feedbot::search::feedback::FeedbackSearchProvider;
use feedbot::search::{SearchProvider, SearchRegistry};
use feedbot::storage::db::create_pool;
use feedbot::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    pretty_env_logger::init_timed();

    let database_path = config::storage::database_path();
    let pool = Arc::new(create_pool(&database_path)?);
    log::info!("Database ready at {database_path}");

    let mut providers: Vec<Box<dyn SearchProvider>> =
        vec![Box::new(FeedbackSearchProvider::new(pool.clone()))];
    if config::search::external_providers_enabled() {
        match BlackboxSearchProvider::new() {
            Ok(provider) => providers.push(Box::new(provider)),
            Err(e) => log::warn!("Blackbox provider disabled: {e:#}"),
        }
    } else {
        log::info!("External search providers are disabled");
    }

    let dispatcher = Arc::new(ChannelDispatcher::new(
        pool,
        Arc::new(ParserRegistry::new()),
        Arc::new(SearchRegistry::new(providers)),
        Some(config::search::country_code()),
    ));

    let bot = create_bot()?;
    let me = bot.get_me().await?;
    log::info!(
        "Running as @{}",
        me.user.username.as_deref().unwrap_or("<unnamed>")
    );

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {e}");
    }

    let deps = HandlerDeps {
        dispatcher,
        bot_id: me.user.id.0 as i64,
    };

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
