use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use teloxide::adaptors::throttle::Limits;
use teloxide::prelude::*;
use tracing::{info, warn};

use dexbot::analytics::Analytics;
use dexbot::bot::{self, word_of_the_day, AppState};
use dexbot::config::Config;
use dexbot::db;
use dexbot::definition::DefinitionRenderer;
use dexbot::dex_client::DexClient;
use dexbot::localization::Localization;
use dexbot::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    telemetry::init_tracing(&config)?;

    info!("Starting dexbot");
    if config.render.debug {
        info!("Debug mode enabled");
    }

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to the database")?;
    db::init_database_schema(&pool).await?;

    // Throttle queues requests to stay within Telegram's rate limits
    let bot = Bot::new(&config.bot_token).throttle(Limits::default());
    let me = bot.get_me().await.context("Failed to get bot info")?;
    info!(username = %me.username(), "Bot initialized");

    let state = Arc::new(AppState {
        dex: DexClient::new(config.dex.clone()).context("Failed to build dexonline client")?,
        pool,
        localization: Localization::new()?,
        analytics: Analytics::new(config.google_analytics_id.clone()),
        renderer: DefinitionRenderer::new(me.username(), config.render.clone()),
        config,
    });

    if let Some(admin_user_id) = state.config.admin_user_id {
        let notice = state.localization.get("bot-restarted");
        if let Err(e) = bot.send_message(ChatId(admin_user_id as i64), notice).await {
            warn!(error = %e, "Failed to notify the admin about the restart");
        }
    }

    tokio::spawn(word_of_the_day::run_scheduler(bot.clone(), Arc::clone(&state)));

    info!("Starting dispatcher");
    Dispatcher::builder(bot, bot::build_handler())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
