//! # Assembler Module
//!
//! Builds a message body out of independently rendered fragments without
//! exceeding the message length budget. Each fragment is a balanced HTML unit,
//! so cutting between fragments can never leave a tag open.

use teloxide::utils::html;

pub const ELLIPSIS: &str = "…";
pub const DEFINITION_AND_FOOTER_SEPARATOR: &str = "\n\n";

/// One balanced piece of a rendered definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Plain text the fragment shows, counted against the budget
    pub text: String,
    /// HTML rendering of the same text
    pub html: String,
}

impl Fragment {
    pub fn new(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: html.into(),
        }
    }

    /// A fragment without markup; the HTML is the escaped text
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        let html = html::escape(&text);
        Self { text, html }
    }

    pub fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Length budget left for the body once the separator, footer and a possible
/// ellipsis have been reserved
pub fn message_limit(max_message_length: usize, footer: &str) -> usize {
    max_message_length
        .saturating_sub(char_len(DEFINITION_AND_FOOTER_SEPARATOR))
        .saturating_sub(char_len(footer))
        .saturating_sub(char_len(ELLIPSIS))
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Accumulates fragments until the next one would overflow the budget
#[derive(Debug)]
pub struct BoundedAssembler<'a> {
    message_limit: usize,
    suffix: &'a str,
    html: String,
    text_len: usize,
    truncated: bool,
}

impl<'a> BoundedAssembler<'a> {
    /// Start a body with `prefix`; both `prefix` and `suffix` count against the
    /// budget, the suffix is appended on finish
    pub fn new(prefix: &str, message_limit: usize, suffix: &'a str) -> Self {
        Self {
            message_limit,
            suffix,
            html: prefix.to_string(),
            text_len: char_len(prefix),
            truncated: false,
        }
    }

    /// Append a fragment if it fits. Returns `false` once the body has been cut,
    /// after which every further fragment is ignored.
    pub fn push(&mut self, fragment: &Fragment) -> bool {
        if self.truncated {
            return false;
        }

        let fragment_len = fragment.text_len();
        if self.text_len + fragment_len + char_len(self.suffix) > self.message_limit {
            self.html.push_str(ELLIPSIS);
            self.truncated = true;
            return false;
        }

        self.html.push_str(&fragment.html);
        self.text_len += fragment_len;
        true
    }

    /// Append the separator, the footer and the suffix
    pub fn finish(mut self, footer: &str) -> String {
        self.html.push_str(DEFINITION_AND_FOOTER_SEPARATOR);
        self.html.push_str(footer);
        self.html.push_str(self.suffix);
        self.html
    }
}

/// Assemble a whole fragment list in one go
pub fn assemble(
    prefix: &str,
    fragments: &[Fragment],
    message_limit: usize,
    suffix: &str,
    footer: &str,
) -> String {
    let mut assembler = BoundedAssembler::new(prefix, message_limit, suffix);
    for fragment in fragments {
        if !assembler.push(fragment) {
            break;
        }
    }
    assembler.finish(footer)
}
