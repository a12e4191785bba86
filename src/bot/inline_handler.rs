//! Inline Handler module answering `@bot word` queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::InlineQueryResult;
use tracing::{debug, error, info, warn};

use super::ui_builder::{definition_article, no_results_button};
use super::{DexBot, SharedState};
use crate::analytics::AnalyticsType;
use crate::config::MESSAGES_COUNT_LIMIT;
use crate::definition::RawDefinition;
use crate::dex_client::parse_offset;
use crate::pagination::build_pagination_buttons;

/// How long Telegram may cache inline answers, in seconds
pub const RESULTS_CACHE_TIME: u32 = 60 * 60;

/// Results of one inline page and the offset Telegram should send back for the
/// next one
#[derive(Debug, PartialEq)]
pub struct InlinePage<'a> {
    pub definitions: Vec<&'a RawDefinition>,
    pub next_offset: Option<String>,
}

/// Cut a page of at most `limit` definitions. The next offset is the index of
/// the last definition shown.
pub fn inline_page(definitions: Vec<&RawDefinition>, limit: usize) -> InlinePage<'_> {
    let has_more = definitions.len() > limit;
    let definitions: Vec<&RawDefinition> = definitions.into_iter().take(limit).collect();
    let next_offset = if has_more {
        definitions.last().map(|definition| definition.index.to_string())
    } else {
        None
    };

    InlinePage {
        definitions,
        next_offset,
    }
}

pub async fn inline_handler(bot: DexBot, q: InlineQuery, state: SharedState) -> Result<()> {
    let user_id = q.from.id.0;
    let query = q.query.trim();
    let debug_fragment = state.config.dex.debug_fragment.is_some();

    if query.is_empty() && !debug_fragment {
        warn!(user_id = %user_id, "Empty query");
        state.analytics.track(AnalyticsType::EmptyQuery, user_id, "");
        return Ok(());
    }

    info!(
        user_id = %user_id,
        username = q.from.username.as_deref().unwrap_or("-"),
        query = %query,
        offset = %q.offset,
        "Received inline query"
    );

    let offset = parse_offset(&q.offset);
    if offset.is_none() {
        state.analytics.track(AnalyticsType::InlineQuery, user_id, query);
    }

    let cache_time = if state.config.render.debug {
        0
    } else {
        RESULTS_CACHE_TIME
    };

    let definitions = match state.dex.fetch_definitions(query).await {
        Ok(definitions) => definitions,
        Err(e) => {
            error!(query = %query, error = %e, "Failed to fetch definitions");
            bot.answer_inline_query(q.id, Vec::<InlineQueryResult>::new())
                .cache_time(0)
                .await?;
            return Ok(());
        }
    };

    let remaining = match offset {
        Some(offset) => definitions.after_offset(offset),
        None => definitions.definitions.iter().collect(),
    };
    let page = inline_page(remaining, MESSAGES_COUNT_LIMIT);
    debug!(
        query = %query,
        total = definitions.total,
        shown = page.definitions.len(),
        "Answering inline query"
    );

    let results: Vec<InlineQueryResult> = page
        .definitions
        .iter()
        .map(|raw_definition| {
            let parsed = state.renderer.parse_definition(
                raw_definition,
                &definitions.base_url,
                false,
                "",
                "",
            );
            let buttons =
                build_pagination_buttons(Some(query), definitions.total, parsed.index, false);
            definition_article(&parsed, buttons)
        })
        .collect();

    let mut answer = bot.answer_inline_query(q.id, results).cache_time(cache_time);
    if let Some(next_offset) = page.next_offset {
        answer = answer.next_offset(next_offset);
    }
    if definitions.is_empty() && offset.is_none() {
        if let Some(button) = no_results_button(&state.localization, query) {
            answer = answer.button(button);
        }
    }
    answer.await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex_client::Definitions;

    fn definitions(count: usize) -> Definitions {
        Definitions::from_raw(
            "base",
            (0..count).map(|_| RawDefinition::from_fragment("x")).collect(),
            None,
        )
    }

    #[test]
    fn test_small_result_has_no_next_offset() {
        let definitions = definitions(3);
        let page = inline_page(definitions.definitions.iter().collect(), 50);

        assert_eq!(page.definitions.len(), 3);
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn test_pages_continue_after_last_shown_index() {
        let definitions = definitions(120);

        let first = inline_page(definitions.definitions.iter().collect(), 50);
        assert_eq!(first.definitions.len(), 50);
        assert_eq!(first.next_offset.as_deref(), Some("49"));

        let offset = parse_offset("49").unwrap();
        let second = inline_page(definitions.after_offset(offset), 50);
        assert_eq!(second.definitions[0].index, 50);
        assert_eq!(second.next_offset.as_deref(), Some("99"));

        let third = inline_page(definitions.after_offset(99), 50);
        assert_eq!(third.definitions.len(), 20);
        assert_eq!(third.next_offset, None);
    }
}
