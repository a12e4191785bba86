//! Word of the day: rendering, the daily broadcast to subscribers and the
//! scheduler driving it.

use anyhow::{Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info, warn};

use super::ui_builder::{disabled_link_preview, keyboard};
use super::{DexBot, SharedState};
use crate::db;
use crate::definition::ParsedDefinition;
use crate::dex_client::WordOfTheDay;
use crate::pagination::word_of_the_day_buttons;

/// Time left until the next broadcast at `hour`:00, today or tomorrow
pub fn next_run_delay(now: NaiveDateTime, hour: u32) -> Duration {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut next_run = now.date().and_time(time);
    if next_run <= now {
        next_run += ChronoDuration::days(1);
    }

    (next_run - now).to_std().unwrap_or_default()
}

/// Today's word of the day, rendered
pub async fn render_word_of_the_day(
    state: &SharedState,
    links_toggle: bool,
) -> Result<(WordOfTheDay, ParsedDefinition)> {
    let today = Local::now().date_naive();
    let word = state
        .dex
        .fetch_word_of_the_day(today)
        .await
        .with_context(|| format!("Failed to fetch the word of the day for {today}"))?;

    let parsed = state.renderer.parse_definition(
        &word.definition,
        &word.base_url,
        links_toggle,
        &word.prefix(),
        &word.suffix(),
    );

    Ok((word, parsed))
}

/// Send the word of the day to every subscriber. Returns how many messages
/// were delivered and how many subscribers there are.
pub async fn broadcast_word_of_the_day(bot: &DexBot, state: &SharedState) -> Result<(usize, usize)> {
    let (_, parsed) = render_word_of_the_day(state, false).await?;
    let subscribers = db::list_subscribed_telegram_ids(&state.pool).await?;
    info!(subscribers = subscribers.len(), "Broadcasting word of the day");

    let mut sent = 0;
    for telegram_id in &subscribers {
        let result = bot
            .send_message(ChatId(*telegram_id), parsed.html.clone())
            .parse_mode(ParseMode::Html)
            .link_preview_options(disabled_link_preview())
            .reply_markup(keyboard(word_of_the_day_buttons(false)))
            .await;

        match result {
            Ok(_) => sent += 1,
            // Usually a user who blocked the bot
            Err(e) => warn!(telegram_id, error = %e, "Failed to send word of the day"),
        }
    }

    info!(sent, total = subscribers.len(), "Word of the day broadcast finished");
    Ok((sent, subscribers.len()))
}

/// Broadcast every day at the configured hour, until the process exits
pub async fn run_scheduler(bot: DexBot, state: SharedState) {
    let hour = state.config.word_of_the_day_hour;

    loop {
        let delay = next_run_delay(Local::now().naive_local(), hour);
        info!(hour, delay_secs = delay.as_secs(), "Next word of the day broadcast scheduled");
        tokio::time::sleep(delay).await;

        if let Err(e) = broadcast_word_of_the_day(&bot, &state).await {
            error!(error = %e, "Word of the day broadcast failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        assert_eq!(next_run_delay(at(7, 30), 9), Duration::from_secs(90 * 60));
    }

    #[test]
    fn test_next_run_tomorrow() {
        assert_eq!(next_run_delay(at(9, 0), 9), Duration::from_secs(24 * 3600));
        assert_eq!(next_run_delay(at(10, 0), 9), Duration::from_secs(23 * 3600));
    }

    #[test]
    fn test_invalid_hour_is_clamped() {
        assert_eq!(next_run_delay(at(22, 0), 30), Duration::from_secs(3600));
    }
}
