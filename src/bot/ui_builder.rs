//! UI Builder module for creating inline results, keyboards and canned messages

use reqwest::Url;
use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, InlineQueryResult, InlineQueryResultArticle,
    InlineQueryResultsButton, InlineQueryResultsButtonKind, InputMessageContent,
    InputMessageContentText, LinkPreviewOptions, ParseMode,
};
use teloxide::utils::html;
use tracing::warn;
use uuid::Uuid;

use crate::definition::ParsedDefinition;
use crate::dex_client::{search_url, DEX_THUMBNAIL_URL};
use crate::localization::Localization;
use crate::word_linker::base64_url_encode;

/// Telegram only accepts start parameters up to this many characters
pub const START_PARAMETER_LIMIT: usize = 64;

/// Definitions link to dexonline a lot; previews would only add noise
pub fn disabled_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

pub fn keyboard(rows: Vec<Vec<InlineKeyboardButton>>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(rows)
}

/// Inline query result sending a rendered definition
pub fn definition_article(
    parsed: &ParsedDefinition,
    buttons: Vec<Vec<InlineKeyboardButton>>,
) -> InlineQueryResult {
    let content = InputMessageContentText::new(parsed.html.clone())
        .parse_mode(ParseMode::Html)
        .link_preview_options(disabled_link_preview());

    let mut article = InlineQueryResultArticle::new(
        Uuid::new_v4().to_string(),
        parsed.title.clone(),
        InputMessageContent::Text(content),
    )
    .reply_markup(keyboard(buttons));

    match Url::parse(&parsed.url) {
        Ok(url) => article = article.url(url),
        Err(_) => warn!(url = %parsed.url, "Definition URL is not absolute, omitting it"),
    }
    if let Ok(thumbnail) = Url::parse(DEX_THUMBNAIL_URL) {
        article = article.thumbnail_url(thumbnail);
    }

    InlineQueryResult::Article(article)
}

/// Apology with a link to dexonline's full-text search
pub fn no_results_message(localization: &Localization, base_url: &str, query: &str) -> String {
    let url = html::escape(&search_url(base_url, query));
    let query = html::escape(query);
    localization.get_with_args("no-results", &[("query", query.as_str()), ("url", url.as_str())])
}

/// "Niciun rezultat" button opening a private chat that looks the query up again
pub fn no_results_button(localization: &Localization, query: &str) -> Option<InlineQueryResultsButton> {
    let parameter = base64_url_encode(query);
    if parameter.len() > START_PARAMETER_LIMIT {
        warn!(query = %query, "Query too long for a start parameter");
        return None;
    }

    Some(InlineQueryResultsButton {
        text: localization.get("no-results-inline"),
        kind: InlineQueryResultsButtonKind::StartParameter(parameter),
    })
}

/// Welcome keyboard: try the bot inline in another chat
pub fn welcome_keyboard(localization: &Localization) -> InlineKeyboardMarkup {
    keyboard(vec![vec![InlineKeyboardButton::switch_inline_query(
        localization.get("try-button"),
        localization.get("try-query"),
    )]])
}
