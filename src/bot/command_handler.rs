//! Command Handler module for `/start` and the admin commands

use anyhow::Result;
use chrono::Utc;
use std::path::Path;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::{debug, error, info, warn};

use super::message_handler::send_definition;
use super::ui_builder::{disabled_link_preview, keyboard, welcome_keyboard};
use super::word_of_the_day::broadcast_word_of_the_day;
use super::{Command, DexBot, SharedState};
use crate::analytics::AnalyticsType;
use crate::db::{self, UserListing, USERS_TABLE_LIMIT};
use crate::pagination::subscription_onboarding_buttons;
use crate::word_linker::base64_url_decode;

/// Decode a `/start` payload. Deep links carry base64url, anything else is
/// taken as typed.
pub fn decode_start_payload(payload: &str) -> String {
    let payload = payload.trim();
    base64_url_decode(payload).unwrap_or_else(|_| payload.to_string())
}

pub async fn command_handler(
    bot: DexBot,
    msg: Message,
    cmd: Command,
    state: SharedState,
) -> Result<()> {
    match cmd {
        Command::Start(payload) => handle_start(&bot, &msg, &state, &payload).await,
        Command::Users => handle_users(&bot, &msg, &state, UserListing::Created).await,
        Command::Recent => handle_users(&bot, &msg, &state, UserListing::RecentlyActive).await,
        Command::Subscribers => handle_users(&bot, &msg, &state, UserListing::Subscribed).await,
        Command::Logs => handle_logs(&bot, &msg, &state).await,
        Command::ClearCache(query) => handle_clear_cache(&bot, &msg, &state, &query).await,
        Command::Wotd => handle_word_of_the_day(&bot, &msg, &state).await,
    }
}

/// Track the command and refuse it unless it comes from the admin
pub async fn check_admin(bot: &DexBot, msg: &Message, state: &SharedState) -> Result<bool> {
    let user_id = msg.from.as_ref().map(|user| user.id.0).unwrap_or_default();
    state
        .analytics
        .track(AnalyticsType::Command, user_id, msg.text().unwrap_or_default());

    if state.config.is_admin(user_id) {
        return Ok(true);
    }

    warn!(user_id = %user_id, command = ?msg.text(), "Admin command refused");
    bot.send_message(msg.chat.id, state.localization.get("not-allowed"))
        .await?;
    Ok(false)
}

async fn handle_start(bot: &DexBot, msg: &Message, state: &SharedState, payload: &str) -> Result<()> {
    let query = decode_start_payload(payload);
    let user = msg.from.as_ref();
    let user_id = user.map(|user| user.id.0).unwrap_or_default();

    state
        .analytics
        .track(AnalyticsType::Command, user_id, &format!("/start {query}"));

    let created = match user {
        Some(user) => {
            match db::create_or_update_user(&state.pool, user.id.0 as i64, user.username.as_deref())
                .await
            {
                Ok((_, created)) => created,
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Failed to register user");
                    false
                }
            }
        }
        None => false,
    };

    if query.is_empty() {
        debug!(user_id = %user_id, "Sending welcome message");
        let welcome = state
            .localization
            .get_with_args("welcome", &[("bot_name", state.renderer.bot_name())]);
        bot.send_message(msg.chat.id, welcome)
            .parse_mode(ParseMode::Html)
            .link_preview_options(disabled_link_preview())
            .reply_markup(welcome_keyboard(&state.localization))
            .await?;
    } else {
        info!(user_id = %user_id, query = %query, "Lookup from start payload");
        send_definition(bot, state, msg.chat.id, &query, None).await?;
    }

    if created {
        bot.send_message(msg.chat.id, state.localization.get("subscription-question"))
            .reply_markup(keyboard(subscription_onboarding_buttons()))
            .await?;
    }

    Ok(())
}

async fn handle_users(
    bot: &DexBot,
    msg: &Message,
    state: &SharedState,
    listing: UserListing,
) -> Result<()> {
    if !check_admin(bot, msg, state).await? {
        return Ok(());
    }

    let users = db::list_users(&state.pool, listing, USERS_TABLE_LIMIT).await?;
    bot.send_message(msg.chat.id, db::format_users_table(&users, Utc::now()))
        .parse_mode(ParseMode::Html)
        .link_preview_options(disabled_link_preview())
        .await?;

    Ok(())
}

/// Whether the error log exists and has content
fn has_log(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|metadata| metadata.len() > 0)
        .unwrap_or(false)
}

async fn handle_logs(bot: &DexBot, msg: &Message, state: &SharedState) -> Result<()> {
    if !check_admin(bot, msg, state).await? {
        return Ok(());
    }

    let path = Path::new(&state.config.error_log_path);
    if has_log(path) {
        bot.send_document(msg.chat.id, InputFile::file(path)).await?;
    } else {
        bot.send_message(msg.chat.id, state.localization.get("log-empty"))
            .await?;
    }

    Ok(())
}

async fn handle_clear_cache(
    bot: &DexBot,
    msg: &Message,
    state: &SharedState,
    query: &str,
) -> Result<()> {
    if !check_admin(bot, msg, state).await? {
        return Ok(());
    }

    let query = query.trim();
    let reply = if query.is_empty() {
        state.localization.get("clear-cache-usage")
    } else if state.dex.clear_cache(query) {
        info!(query = %query, "Cache cleared");
        state
            .localization
            .get_with_args("cache-cleared", &[("query", query)])
    } else {
        state
            .localization
            .get_with_args("cache-missing", &[("query", query)])
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

async fn handle_word_of_the_day(bot: &DexBot, msg: &Message, state: &SharedState) -> Result<()> {
    if !check_admin(bot, msg, state).await? {
        return Ok(());
    }

    let reply = match broadcast_word_of_the_day(bot, state).await {
        Ok((sent, total)) => {
            let (sent, total) = (sent.to_string(), total.to_string());
            state
                .localization
                .get_with_args("broadcast-done", &[("sent", sent.as_str()), ("total", total.as_str())])
        }
        Err(e) => {
            error!(error = %e, "Word of the day broadcast failed");
            state.localization.get("word-of-the-day-unavailable")
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
