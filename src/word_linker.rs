//! # Word Linker Module
//!
//! Alternate rendering where every word of a definition becomes a deep link
//! that opens the bot with that word as the start parameter.

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use teloxide::utils::html;

use crate::assembler::Fragment;

pub const BOT_START_URL_FORMAT: &str = "https://t.me/{bot}?start={payload}";

lazy_static! {
    /// Alternating runs of word characters and everything else
    static ref WORD_REGEX: Regex =
        Regex::new(r"(?P<word>[\p{L}\p{M}\p{N}]+)|(?P<other>[^\p{L}\p{M}\p{N}]+)")
            .expect("Word pattern should be valid");
}

/// A maximal run of the input, either a word or the text between words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Word(&'a str),
    Other(&'a str),
}

/// Split text into word and non-word runs covering the whole input
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    WORD_REGEX
        .captures_iter(text)
        .filter_map(|captures| {
            if let Some(word) = captures.name("word") {
                Some(Token::Word(word.as_str()))
            } else {
                captures.name("other").map(|other| Token::Other(other.as_str()))
            }
        })
        .collect()
}

/// URL-safe base64 without padding, as Telegram start parameters require
pub fn base64_url_encode(text: &str) -> String {
    URL_SAFE_NO_PAD.encode(text.as_bytes())
}

/// Decode a URL-safe base64 string, with or without padding
pub fn base64_url_decode(encoded: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim().trim_end_matches('='))
        .context("Invalid base64 payload")?;
    String::from_utf8(bytes).context("Base64 payload is not UTF-8")
}

/// `https://t.me/<bot>?start=<base64url(word)>`
pub fn start_url(bot_name: &str, word: &str) -> String {
    BOT_START_URL_FORMAT
        .replace("{bot}", bot_name)
        .replace("{payload}", &base64_url_encode(word))
}

/// Anchor linking a word back to the bot
pub fn get_word_link(word: &str, bot_name: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        start_url(bot_name, word),
        html::escape(word)
    )
}

/// Render plain text as linked-word fragments
pub fn link_words(text: &str, bot_name: &str) -> Vec<Fragment> {
    tokenize(text)
        .into_iter()
        .map(|token| match token {
            Token::Word(word) => Fragment::new(word, get_word_link(word, bot_name)),
            Token::Other(other) => Fragment::plain(other),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_covers_input() {
        let text = "CASĂ, case, s. f. 1 (Clădire)...";
        let tokens = tokenize(text);

        let rebuilt: String = tokens
            .iter()
            .map(|token| match token {
                Token::Word(w) | Token::Other(w) => *w,
            })
            .collect();
        assert_eq!(rebuilt, text);
        assert_eq!(tokens[0], Token::Word("CASĂ"));
        assert_eq!(tokens[1], Token::Other(", "));
    }

    #[test]
    fn test_tokenize_keeps_combining_marks_in_words() {
        // "ă" written as a + combining breve
        let tokens = tokenize("ca\u{306}sa\u{306} x");

        assert_eq!(tokens[0], Token::Word("ca\u{306}sa\u{306}"));
    }

    #[test]
    fn test_base64_round_trip_without_padding() {
        let encoded = base64_url_encode("cuvânt");

        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+') && !encoded.contains('/'));
        assert_eq!(base64_url_decode(&encoded).unwrap(), "cuvânt");
    }

    #[test]
    fn test_base64_decode_accepts_padding() {
        assert_eq!(base64_url_decode("YQ==").unwrap(), "a");
        assert_eq!(base64_url_decode("YQ").unwrap(), "a");
        assert!(base64_url_decode("!!!").is_err());
    }

    #[test]
    fn test_word_link() {
        assert_eq!(
            get_word_link("mare", "TestBot"),
            "<a href=\"https://t.me/TestBot?start=bWFyZQ\">mare</a>"
        );
    }

    #[test]
    fn test_link_words_leaves_separators_plain() {
        let fragments = link_words("a & b", "TestBot");

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1].html, " &amp; ");
        assert_eq!(fragments[1].text, " & ");
    }
}
