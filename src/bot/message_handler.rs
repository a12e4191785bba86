//! Message Handler module for words sent in private chats

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InlineKeyboardMarkup, MessageId, ParseMode, ReplyParameters};
use tracing::{debug, error, info};

use super::ui_builder::{disabled_link_preview, keyboard, no_results_message};
use super::{DexBot, SharedState};
use crate::analytics::AnalyticsType;
use crate::errors::DexError;
use crate::pagination::build_pagination_buttons;

/// One definition ready to be sent or edited into a chat message
pub struct DefinitionPage {
    pub html: String,
    pub keyboard: InlineKeyboardMarkup,
}

/// Render the definition at position `offset` of the results for `query`,
/// falling back to the first one. `None` when there are no definitions.
pub async fn definition_page(
    state: &SharedState,
    query: &str,
    offset: usize,
    links_toggle: bool,
) -> Result<Option<DefinitionPage>, DexError> {
    let definitions = state.dex.fetch_definitions(query).await?;
    let total = definitions.definitions.len();

    let (offset, raw_definition) = match definitions.definitions.get(offset) {
        Some(raw_definition) => (offset, raw_definition),
        None => match definitions.definitions.first() {
            Some(raw_definition) => (0, raw_definition),
            None => return Ok(None),
        },
    };

    let parsed = state.renderer.parse_definition(
        raw_definition,
        &definitions.base_url,
        links_toggle,
        "",
        "",
    );

    Ok(Some(DefinitionPage {
        html: parsed.html,
        keyboard: keyboard(build_pagination_buttons(
            Some(query),
            total,
            offset,
            links_toggle,
        )),
    }))
}

/// Send the first definition of `query`, or the no-results message
pub async fn send_definition(
    bot: &DexBot,
    state: &SharedState,
    chat_id: ChatId,
    query: &str,
    reply_to: Option<MessageId>,
) -> Result<()> {
    let (text, markup) = match definition_page(state, query, 0, false).await {
        Ok(Some(page)) => (page.html, Some(page.keyboard)),
        Ok(None) => {
            info!(query = %query, "No definitions found");
            (
                no_results_message(&state.localization, &state.config.dex.base_url, query),
                None,
            )
        }
        Err(e) => {
            error!(query = %query, error = %e, "Failed to fetch definitions");
            (state.localization.get("dex-unavailable"), None)
        }
    };

    let mut request = bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .link_preview_options(disabled_link_preview());
    if let Some(markup) = markup {
        request = request.reply_markup(markup);
    }
    if let Some(message_id) = reply_to {
        request = request.reply_parameters(ReplyParameters::new(message_id));
    }
    request.await?;

    Ok(())
}

/// The word to look up in a message text. Empty texts and commands the bot
/// does not know (`/help`) are not lookups.
pub fn lookup_query(text: Option<&str>) -> Option<&str> {
    text.map(str::trim)
        .filter(|text| !text.is_empty() && !text.starts_with('/'))
}

/// Look up the text of private messages
pub async fn message_handler(bot: DexBot, msg: Message, state: SharedState) -> Result<()> {
    // Messages sent through an inline bot (including ourselves) are results, not queries
    if msg.via_bot.is_some() || !msg.chat.is_private() {
        return Ok(());
    }

    let Some(query) = lookup_query(msg.text()) else {
        debug!(chat_id = %msg.chat.id, text = ?msg.text(), "Ignoring message without a word to look up");
        return Ok(());
    };

    let user_id = msg.from.as_ref().map(|user| user.id.0).unwrap_or_default();
    info!(user_id = %user_id, query = %query, "Received word lookup");

    if let Err(e) = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await {
        debug!(error = %e, "Failed to send typing action");
    }

    state.analytics.track(AnalyticsType::Message, user_id, query);

    send_definition(&bot, &state, msg.chat.id, query, Some(msg.id)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_query_trims_words() {
        assert_eq!(lookup_query(Some("  casă ")), Some("casă"));
        assert_eq!(lookup_query(Some("casă /mare")), Some("casă /mare"));
    }

    #[test]
    fn test_lookup_query_skips_unknown_commands() {
        assert_eq!(lookup_query(Some("/help")), None);
        assert_eq!(lookup_query(Some(" /start@OtherBot")), None);
    }

    #[test]
    fn test_lookup_query_skips_empty_text() {
        assert_eq!(lookup_query(Some("   ")), None);
        assert_eq!(lookup_query(None), None);
    }
}
