//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardMarkup, MessageId, ParseMode};
use tracing::{debug, error, info, warn};

use super::message_handler::definition_page;
use super::ui_builder::{disabled_link_preview, keyboard};
use super::word_of_the_day::render_word_of_the_day;
use super::{DexBot, SharedState};
use crate::db;
use crate::pagination::{decode_state, word_of_the_day_buttons, PaginationState};
use crate::subscription::Subscription;

/// The message a callback button belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Chat(ChatId, MessageId),
    /// A message sent through inline mode, only reachable by its id
    Inline(String),
}

impl EditTarget {
    /// Chat messages take precedence over inline message ids
    pub fn new(message: Option<(ChatId, MessageId)>, inline_message_id: Option<String>) -> Option<Self> {
        match (message, inline_message_id) {
            (Some((chat_id, message_id)), _) => Some(EditTarget::Chat(chat_id, message_id)),
            (None, Some(inline_message_id)) => Some(EditTarget::Inline(inline_message_id)),
            (None, None) => None,
        }
    }

    pub fn from_callback(q: &CallbackQuery) -> Option<Self> {
        Self::new(
            q.message.as_ref().map(|message| (message.chat().id, message.id())),
            q.inline_message_id.clone(),
        )
    }
}

/// Edit request for a message sent through inline mode. Inline edits only
/// take the boolean preview switch, not link preview options.
fn inline_edit_request<R: Requester>(
    bot: &R,
    inline_message_id: &str,
    html: String,
) -> R::EditMessageTextInline {
    bot.edit_message_text_inline(inline_message_id, html)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
}

/// Replace the text and keyboard of the message behind a callback
async fn edit_message(
    bot: &DexBot,
    target: &EditTarget,
    html: String,
    markup: Option<InlineKeyboardMarkup>,
) {
    let result = match target {
        EditTarget::Chat(chat_id, message_id) => {
            let mut request = bot
                .edit_message_text(*chat_id, *message_id, html)
                .parse_mode(ParseMode::Html)
                .link_preview_options(disabled_link_preview());
            if let Some(markup) = markup {
                request = request.reply_markup(markup);
            }
            request.await.map(|_| ())
        }
        EditTarget::Inline(inline_message_id) => {
            let mut request = inline_edit_request(bot, inline_message_id, html);
            if let Some(markup) = markup {
                request = request.reply_markup(markup);
            }
            request.await.map(|_| ())
        }
    };

    // Pressing the current page button again leaves the message unchanged,
    // which Telegram reports as an error
    if let Err(e) = result {
        warn!(target = ?target, error = %e, "Failed to edit message");
    }
}

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: DexBot, q: CallbackQuery, state: SharedState) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    let target = EditTarget::from_callback(&q);
    let mut notice = None;

    match q.data.as_deref().and_then(decode_state) {
        None => debug!(user_id = %q.from.id, "Ignoring inert callback"),
        Some(PaginationState {
            subscription: Some(subscription),
            ..
        }) => {
            notice = handle_subscription(&bot, &q, &state, subscription, target.as_ref()).await;
        }
        Some(payload) => match &target {
            Some(target) => handle_page(&bot, &state, payload, target).await,
            None => warn!(user_id = %q.from.id, "Callback without a message to edit"),
        },
    }

    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(text) = notice {
        answer = answer.text(text);
    }
    if let Err(e) = answer.await {
        error!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    Ok(())
}

/// Store the subscription answer. Onboarding questions are replaced by the
/// answer, anything else gets the answer as a notification.
async fn handle_subscription(
    bot: &DexBot,
    q: &CallbackQuery,
    state: &SharedState,
    subscription: Subscription,
    target: Option<&EditTarget>,
) -> Option<String> {
    let telegram_id = q.from.id.0 as i64;

    let stored = match db::create_or_update_user(&state.pool, telegram_id, q.from.username.as_deref())
        .await
    {
        Ok(_) => db::set_subscription(&state.pool, telegram_id, subscription).await,
        Err(e) => Err(e),
    };
    if let Err(e) = stored {
        error!(telegram_id, error = %e, "Failed to store subscription");
        return Some(state.localization.get("subscription-failed"));
    }

    let key = match subscription {
        Subscription::Accepted => "subscription-accepted",
        Subscription::Denied => "subscription-denied",
        Subscription::Revoked | Subscription::Undetermined => "subscription-revoked",
    };
    let reply = state.localization.get(key);
    info!(telegram_id, subscription = %subscription, "Subscription answered");

    match (subscription, target) {
        (Subscription::Accepted | Subscription::Denied, Some(target @ EditTarget::Chat(..))) => {
            edit_message(bot, target, reply, None).await;
            None
        }
        _ => Some(reply),
    }
}

/// Show another page, or the same page with links toggled
async fn handle_page(
    bot: &DexBot,
    state: &SharedState,
    payload: PaginationState,
    target: &EditTarget,
) {
    match payload.query {
        Some(query) => {
            match definition_page(state, &query, payload.offset, payload.links_toggle).await {
                Ok(Some(page)) => edit_message(bot, target, page.html, Some(page.keyboard)).await,
                Ok(None) => {
                    warn!(query = %query, "Definitions disappeared since the message was sent");
                }
                Err(e) => error!(query = %query, error = %e, "Failed to fetch definitions"),
            }
        }
        None => match render_word_of_the_day(state, payload.links_toggle).await {
            Ok((_, parsed)) => {
                let markup = keyboard(word_of_the_day_buttons(payload.links_toggle));
                edit_message(bot, target, parsed.html, Some(markup)).await;
            }
            Err(e) => error!(error = %e, "Failed to render the word of the day"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::requests::HasPayload;

    #[test]
    fn test_chat_message_takes_precedence() {
        let target = EditTarget::new(Some((ChatId(7), MessageId(42))), Some("AAQ".to_string()));

        assert_eq!(target, Some(EditTarget::Chat(ChatId(7), MessageId(42))));
    }

    #[test]
    fn test_inline_message_target() {
        assert_eq!(
            EditTarget::new(None, Some("AAQ".to_string())),
            Some(EditTarget::Inline("AAQ".to_string()))
        );
    }

    #[test]
    fn test_no_target() {
        assert_eq!(EditTarget::new(None, None), None);
    }

    #[test]
    fn test_inline_edit_disables_preview() {
        let bot = Bot::new("0:test");
        let request = inline_edit_request(&bot, "AAQ", "<b>CASĂ</b>".to_string());
        let payload = request.payload_ref();

        assert_eq!(payload.inline_message_id, "AAQ");
        assert_eq!(payload.text, "<b>CASĂ</b>");
        assert_eq!(payload.parse_mode, Some(ParseMode::Html));
        assert_eq!(payload.disable_web_page_preview, Some(true));
    }
}
