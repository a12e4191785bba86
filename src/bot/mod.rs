//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `command_handler`: `/start` and the admin commands
//! - `message_handler`: Looks up words sent in private chats
//! - `inline_handler`: Answers `@bot word` inline queries
//! - `callback_handler`: Pagination, link toggling and subscription buttons
//! - `word_of_the_day`: Renders and broadcasts the word of the day
//! - `ui_builder`: Creates articles, keyboards and canned messages

pub mod callback_handler;
pub mod command_handler;
pub mod inline_handler;
pub mod message_handler;
pub mod ui_builder;
pub mod word_of_the_day;

use sqlx::PgPool;
use std::sync::Arc;
use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::analytics::Analytics;
use crate::config::Config;
use crate::definition::DefinitionRenderer;
use crate::dex_client::DexClient;
use crate::localization::Localization;

pub use callback_handler::callback_handler;
pub use command_handler::command_handler;
pub use inline_handler::inline_handler;
pub use message_handler::message_handler;

/// Outgoing requests are queued to respect Telegram's rate limits
pub type DexBot = Throttle<Bot>;

/// Everything the handlers share, built once in `main`
pub struct AppState {
    pub config: Config,
    pub dex: DexClient,
    pub pool: PgPool,
    pub localization: Localization,
    pub analytics: Analytics,
    pub renderer: DefinitionRenderer,
}

/// Shared state as injected into handlers
pub type SharedState = Arc<AppState>;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Comenzi disponibile:")]
pub enum Command {
    #[command(description = "pornește botul")]
    Start(String),
    #[command(description = "latest users (admin)")]
    Users,
    #[command(description = "recently active users (admin)")]
    Recent,
    #[command(description = "latest word of the day subscribers (admin)")]
    Subscribers,
    #[command(description = "download the error log (admin)")]
    Logs,
    #[command(description = "forget the cached definitions of a word (admin)")]
    ClearCache(String),
    #[command(description = "send the word of the day to subscribers now (admin)")]
    Wotd,
}

/// Dispatch tree: commands, then plain messages, inline queries and callbacks
pub fn build_handler() -> UpdateHandler<anyhow::Error> {
    let messages = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(dptree::endpoint(message_handler));

    dptree::entry()
        .branch(messages)
        .branch(Update::filter_inline_query().endpoint(inline_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert_eq!(
            Command::parse("/start Y2FzxIM", "DexRoBot").unwrap(),
            Command::Start("Y2FzxIM".to_string())
        );
        assert_eq!(
            Command::parse("/clearcache casă", "DexRoBot").unwrap(),
            Command::ClearCache("casă".to_string())
        );
        assert_eq!(Command::parse("/wotd", "DexRoBot").unwrap(), Command::Wotd);
        assert!(Command::parse("casă", "DexRoBot").is_err());
    }

    #[test]
    fn test_start_without_payload() {
        assert_eq!(
            Command::parse("/start", "DexRoBot").unwrap(),
            Command::Start(String::new())
        );
    }
}
