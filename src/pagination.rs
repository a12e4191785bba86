//! # Pagination Module
//!
//! Callback payloads carried by inline keyboard buttons and the keyboards
//! themselves. Payloads are compact JSON objects:
//!
//! | key | meaning                                    |
//! |-----|--------------------------------------------|
//! | `q` | query, absent for the word of the day      |
//! | `o` | offset of the definition shown             |
//! | `l` | whether words are rendered as links        |
//! | `s` | requested subscription state               |

use serde::{Deserialize, Serialize};
use teloxide::types::InlineKeyboardButton;
use tracing::warn;

use crate::config::CALLBACK_DATA_LIMIT;
use crate::subscription::Subscription;

pub const PREVIOUS_PAGE_ICON: &str = "⬅";
pub const PREVIOUS_OVERLAP_PAGE_ICON: &str = "↪";
pub const NEXT_PAGE_ICON: &str = "➡";
pub const NEXT_OVERLAP_PAGE_ICON: &str = "↩";

pub const LINKS_TOGGLE_ON_TEXT: &str = "🔗 Ascunde legăturile";
pub const LINKS_TOGGLE_OFF_TEXT: &str = "🔗 Arată legăturile";

/// Callback data of a button that does nothing when pressed
pub const NULL_CALLBACK_DATA: &str = "null";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationState {
    #[serde(rename = "q", default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(rename = "o", default)]
    pub offset: usize,
    #[serde(rename = "l", default)]
    pub links_toggle: bool,
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

impl PaginationState {
    pub fn page(query: Option<&str>, offset: usize, links_toggle: bool) -> Self {
        Self {
            query: query.map(str::to_string),
            offset,
            links_toggle,
            subscription: None,
        }
    }

    pub fn subscription(subscription: Subscription) -> Self {
        Self {
            subscription: Some(subscription),
            ..Self::default()
        }
    }
}

pub fn encode_state(state: &PaginationState) -> String {
    // A struct of strings, integers and booleans always serializes
    serde_json::to_string(state).unwrap_or_else(|_| NULL_CALLBACK_DATA.to_string())
}

/// Decode callback data. `"null"` and malformed payloads yield `None`.
pub fn decode_state(data: &str) -> Option<PaginationState> {
    if data.trim() == NULL_CALLBACK_DATA {
        return None;
    }

    match serde_json::from_str(data) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(data = %data, error = %e, "Ignoring malformed callback data");
            None
        }
    }
}

/// Offset shown by the "previous" button, wrapping to the last page
pub fn previous_offset(offset: usize, total: usize) -> usize {
    if offset == 0 {
        total.saturating_sub(1)
    } else {
        offset - 1
    }
}

/// Offset shown by the "next" button, wrapping to the first page
pub fn next_offset(offset: usize, total: usize) -> usize {
    if offset + 1 >= total {
        0
    } else {
        offset + 1
    }
}

fn callback_button(text: impl Into<String>, data: String) -> InlineKeyboardButton {
    if data.len() > CALLBACK_DATA_LIMIT {
        warn!(
            length = data.len(),
            limit = CALLBACK_DATA_LIMIT,
            data = %data,
            "Callback data exceeds the Telegram limit"
        );
    }
    InlineKeyboardButton::callback(text, data)
}

fn state_button(text: impl Into<String>, state: &PaginationState) -> InlineKeyboardButton {
    callback_button(text, encode_state(state))
}

/// Keyboard shown under a definition: a paging row when there is more than one
/// definition, then the links toggle row.
pub fn build_pagination_buttons(
    query: Option<&str>,
    total: usize,
    offset: usize,
    links_toggle: bool,
) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = Vec::new();

    if total > 1 {
        let is_first_page = offset == 0;
        let is_last_page = offset + 1 >= total;

        let previous_text = if is_first_page {
            PREVIOUS_OVERLAP_PAGE_ICON
        } else {
            PREVIOUS_PAGE_ICON
        };
        let next_text = if is_last_page {
            NEXT_OVERLAP_PAGE_ICON
        } else {
            NEXT_PAGE_ICON
        };

        let previous = PaginationState::page(query, previous_offset(offset, total), links_toggle);
        let next = PaginationState::page(query, next_offset(offset, total), links_toggle);

        let current_data = if is_first_page {
            NULL_CALLBACK_DATA.to_string()
        } else {
            encode_state(&PaginationState::page(query, 0, links_toggle))
        };

        rows.push(vec![
            state_button(previous_text, &previous),
            callback_button(format!("{} / {}", offset + 1, total), current_data),
            state_button(next_text, &next),
        ]);
    }

    rows.push(vec![links_toggle_button(query, offset, links_toggle)]);
    rows
}

/// Button flipping the links rendering of the definition at `offset`
pub fn links_toggle_button(query: Option<&str>, offset: usize, links_toggle: bool) -> InlineKeyboardButton {
    let text = if links_toggle {
        LINKS_TOGGLE_ON_TEXT
    } else {
        LINKS_TOGGLE_OFF_TEXT
    };
    state_button(text, &PaginationState::page(query, offset, !links_toggle))
}

/// "Nu" / "Da" answer to the word of the day question
pub fn subscription_onboarding_buttons() -> Vec<Vec<InlineKeyboardButton>> {
    vec![vec![
        state_button("Nu", &PaginationState::subscription(Subscription::Denied)),
        state_button("Da", &PaginationState::subscription(Subscription::Accepted)),
    ]]
}

pub fn subscription_cancel_buttons() -> Vec<Vec<InlineKeyboardButton>> {
    vec![vec![state_button(
        "Oprește",
        &PaginationState::subscription(Subscription::Revoked),
    )]]
}

/// Keyboard under the word of the day: links toggle, then unsubscribe
pub fn word_of_the_day_buttons(links_toggle: bool) -> Vec<Vec<InlineKeyboardButton>> {
    let mut rows = vec![vec![links_toggle_button(None, 0, links_toggle)]];
    rows.extend(subscription_cancel_buttons());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn data(button: &InlineKeyboardButton) -> &str {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("Expected callback button, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        let state = PaginationState::page(None, 2, true);

        assert_eq!(encode_state(&state), r#"{"o":2,"l":true}"#);
    }

    #[test]
    fn test_decode_defaults_and_unknown_keys() {
        let state = decode_state(r#"{"q":"casă","x":1}"#).unwrap();

        assert_eq!(state.query.as_deref(), Some("casă"));
        assert_eq!(state.offset, 0);
        assert!(!state.links_toggle);
        assert_eq!(state.subscription, None);
    }

    #[test]
    fn test_decode_null_and_malformed() {
        assert_eq!(decode_state("null"), None);
        assert_eq!(decode_state("{not json"), None);
        assert_eq!(decode_state(r#"{"s":9}"#), None);
    }

    #[test]
    fn test_decode_explicit_null_query() {
        let state = decode_state(r#"{"q":null,"o":0,"l":false}"#).unwrap();

        assert_eq!(state.query, None);
    }

    #[test]
    fn test_single_definition_has_only_toggle_row() {
        let rows = build_pagination_buttons(Some("om"), 1, 0, false);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].text, LINKS_TOGGLE_OFF_TEXT);
    }

    #[test]
    fn test_middle_page() {
        let rows = build_pagination_buttons(Some("om"), 5, 2, false);
        let paging = &rows[0];

        assert_eq!(paging[0].text, PREVIOUS_PAGE_ICON);
        assert_eq!(paging[1].text, "3 / 5");
        assert_eq!(paging[2].text, NEXT_PAGE_ICON);
        assert_eq!(decode_state(data(&paging[0])).unwrap().offset, 1);
        assert_eq!(decode_state(data(&paging[1])).unwrap().offset, 0);
        assert_eq!(decode_state(data(&paging[2])).unwrap().offset, 3);
    }

    #[test]
    fn test_current_button_is_inert_on_first_page() {
        let rows = build_pagination_buttons(Some("om"), 3, 0, false);

        assert_eq!(data(&rows[0][1]), NULL_CALLBACK_DATA);
    }

    #[test]
    fn test_toggle_flips_links_and_keeps_position() {
        let rows = build_pagination_buttons(Some("om"), 3, 1, true);
        let toggle = decode_state(data(&rows[1][0])).unwrap();

        assert_eq!(rows[1][0].text, LINKS_TOGGLE_ON_TEXT);
        assert_eq!(toggle.query.as_deref(), Some("om"));
        assert_eq!(toggle.offset, 1);
        assert!(!toggle.links_toggle);
    }

    #[test]
    fn test_subscription_keyboards() {
        let onboarding = subscription_onboarding_buttons();
        assert_eq!(onboarding[0][0].text, "Nu");
        assert_eq!(data(&onboarding[0][0]), r#"{"o":0,"l":false,"s":2}"#);
        assert_eq!(
            decode_state(data(&onboarding[0][1])).unwrap().subscription,
            Some(Subscription::Accepted)
        );

        let cancel = subscription_cancel_buttons();
        assert_eq!(
            decode_state(data(&cancel[0][0])).unwrap().subscription,
            Some(Subscription::Revoked)
        );
    }

    #[test]
    fn test_word_of_the_day_keyboard() {
        let rows = word_of_the_day_buttons(false);

        assert_eq!(rows.len(), 2);
        assert_eq!(decode_state(data(&rows[0][0])).unwrap().query, None);
        assert_eq!(rows[1][0].text, "Oprește");
    }

    #[test]
    fn test_offset_helpers_wrap() {
        assert_eq!(previous_offset(0, 5), 4);
        assert_eq!(next_offset(4, 5), 0);
        assert_eq!(next_offset(1, 5), 2);
    }
}
