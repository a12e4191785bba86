//! # Definition Module
//!
//! Renders a raw dexonline definition into a Telegram-ready message: a short
//! plain-text title, an HTML body bounded by the message length limit, and the
//! source URL.
//!
//! The body is built from fragments (see [`crate::assembler`]) so that
//! truncation only ever happens between balanced units:
//!
//! - default mode keeps bold/italic emphasis (see [`crate::sanitizer`])
//! - links mode turns every word into a deep link (see [`crate::word_linker`])

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Deserialize;
use teloxide::utils::html;
use tracing::info;

use crate::assembler::{self, Fragment, ELLIPSIS};
use crate::config::RenderConfig;
use crate::markup;
use crate::sanitizer;
use crate::word_linker;

pub const DEX_SOURCES_URL: &str = "https://dexonline.ro/surse";
pub const DEX_AUTHOR_URL: &str = "https://dexonline.ro/utilizator";

/// dexonline sends ids as numbers, older payloads as strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DefinitionId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefinitionId::Number(id) => write!(f, "{id}"),
            DefinitionId::Text(id) => write!(f, "{id}"),
        }
    }
}

/// A definition as returned by the dexonline JSON API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawDefinition {
    pub id: DefinitionId,
    #[serde(rename = "htmlRep", default)]
    pub html_rep: String,
    #[serde(rename = "sourceName", default)]
    pub source_name: Option<String>,
    #[serde(rename = "userNick", default)]
    pub user_nick: Option<String>,
    /// Position in the result list, assigned after fetching
    #[serde(skip)]
    pub index: usize,
}

impl RawDefinition {
    /// Synthetic definition wrapping a markup fragment, used for debugging the renderer
    pub fn from_fragment(fragment: &str) -> Self {
        Self {
            id: DefinitionId::Number(0),
            html_rep: fragment.to_string(),
            source_name: None,
            user_nick: None,
            index: 0,
        }
    }
}

/// A definition rendered for Telegram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDefinition {
    pub index: usize,
    pub title: String,
    pub html: String,
    pub url: String,
}

/// `<base url without spaces>/<definition id>`
pub fn create_definition_url(raw_definition: &RawDefinition, base_url: &str) -> String {
    format!("{}/{}", base_url.replace(' ', ""), raw_definition.id)
}

pub fn create_footer(raw_definition: &RawDefinition, definition_url: &str) -> String {
    let source_name = raw_definition.source_name.as_deref().unwrap_or("-");
    let author = raw_definition.user_nick.as_deref().unwrap_or("-");
    let author_url = format!(
        "{}/{}",
        DEX_AUTHOR_URL,
        utf8_percent_encode(author, NON_ALPHANUMERIC)
    );

    format!(
        "{}\nsursa: <a href=\"{}\">{}</a> adăugată de: <a href=\"{}\">{}</a>",
        html::escape(definition_url),
        DEX_SOURCES_URL,
        html::escape(source_name),
        author_url,
        html::escape(author)
    )
}

/// Cap a title at `limit` characters, ending it with an ellipsis when capped
pub fn truncate_title(title: &str, limit: usize) -> String {
    if title.chars().count() < limit {
        return title.to_string();
    }

    let kept = limit.saturating_sub(ELLIPSIS.chars().count());
    let mut truncated: String = title.chars().take(kept).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Renders raw definitions with fixed rendering settings
#[derive(Debug, Clone)]
pub struct DefinitionRenderer {
    bot_name: String,
    config: RenderConfig,
}

impl DefinitionRenderer {
    pub fn new(bot_name: impl Into<String>, config: RenderConfig) -> Self {
        Self {
            bot_name: bot_name.into(),
            config,
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Render `raw_definition`. `base_url` is the page the definition was found
    /// on; `prefix` and `suffix` wrap the body and are never truncated.
    pub fn parse_definition(
        &self,
        raw_definition: &RawDefinition,
        base_url: &str,
        links_toggle: bool,
        prefix: &str,
        suffix: &str,
    ) -> ParsedDefinition {
        let definition_url = create_definition_url(raw_definition, base_url);
        let footer = create_footer(raw_definition, &definition_url);
        let message_limit = assembler::message_limit(self.config.max_message_length, &footer);

        let mut nodes = markup::parse_fragment(&raw_definition.html_rep);
        sanitizer::replace_node_superscripts(&mut nodes, &definition_url);

        let plain_text = markup::text_content(&nodes);
        let fragments: Vec<Fragment> = if links_toggle {
            word_linker::link_words(&plain_text, &self.bot_name)
        } else {
            nodes.iter().map(sanitizer::sanitize_node).collect()
        };

        let fragments: Vec<Fragment> = fragments
            .into_iter()
            .filter(|fragment| !fragment.html.is_empty())
            .collect();
        let html = assembler::assemble(prefix, &fragments, message_limit, suffix, &footer);

        let mut title = plain_text;
        if self.config.debug {
            title = format!("{}: {}", raw_definition.index, title);
        }
        let title = truncate_title(&title, self.config.title_length_limit);

        if self.config.debug {
            info!(index = raw_definition.index, result = %html, "Rendered definition");
        }

        ParsedDefinition {
            index: raw_definition.index,
            title,
            html,
            url: definition_url,
        }
    }
}
