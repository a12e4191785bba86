//! # Pagination Tests
//!
//! Keyboards built for a five definition result and the callback payloads
//! they carry.

use dexbot::pagination::*;
use dexbot::subscription::Subscription;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardButtonKind};

#[cfg(test)]
mod tests {
    use super::*;

    fn data(button: &InlineKeyboardButton) -> String {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data.clone(),
            other => panic!("Expected callback button, got {other:?}"),
        }
    }

    fn decoded(button: &InlineKeyboardButton) -> PaginationState {
        decode_state(&data(button)).expect("button should carry a state")
    }

    #[test]
    fn test_first_of_five_wraps_backwards() {
        let rows = build_pagination_buttons(Some("casă"), 5, 0, false);
        let paging = &rows[0];

        assert_eq!(paging[0].text, PREVIOUS_OVERLAP_PAGE_ICON);
        assert_eq!(decoded(&paging[0]).offset, 4);
        assert_eq!(paging[1].text, "1 / 5");
        assert_eq!(data(&paging[1]), NULL_CALLBACK_DATA);
        assert_eq!(paging[2].text, NEXT_PAGE_ICON);
        assert_eq!(decoded(&paging[2]).offset, 1);
    }

    #[test]
    fn test_last_of_five_wraps_forwards() {
        let rows = build_pagination_buttons(Some("casă"), 5, 4, true);
        let paging = &rows[0];

        assert_eq!(paging[0].text, PREVIOUS_PAGE_ICON);
        assert_eq!(decoded(&paging[0]).offset, 3);
        assert_eq!(paging[1].text, "5 / 5");
        assert_eq!(decoded(&paging[1]).offset, 0);
        assert_eq!(paging[2].text, NEXT_OVERLAP_PAGE_ICON);
        assert_eq!(decoded(&paging[2]).offset, 0);

        // Paging keeps the links rendering
        assert!(paging.iter().skip(1).all(|button| decoded(button).links_toggle));
        assert_eq!(decoded(&paging[2]).query.as_deref(), Some("casă"));
    }

    #[test]
    fn test_single_definition_only_toggles() {
        let rows = build_pagination_buttons(Some("casă"), 1, 0, false);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert!(decoded(&rows[0][0]).links_toggle);
    }

    #[test]
    fn test_payload_round_trip() {
        let states = [
            PaginationState::page(Some("măr"), 3, true),
            PaginationState::page(None, 0, false),
            PaginationState::subscription(Subscription::Revoked),
        ];

        for state in states {
            assert_eq!(decode_state(&encode_state(&state)), Some(state));
        }
    }

    #[test]
    fn test_payload_keys() {
        let encoded = encode_state(&PaginationState::page(None, 2, true));

        assert_eq!(encoded, r#"{"o":2,"l":true}"#);
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let state = decode_state(r#"{"q":"om","o":1,"l":false,"x":"ignored"}"#).unwrap();

        assert_eq!(state, PaginationState::page(Some("om"), 1, false));
    }

    #[test]
    fn test_decode_rejects_inert_and_malformed_data() {
        assert_eq!(decode_state(NULL_CALLBACK_DATA), None);
        assert_eq!(decode_state("{not json"), None);
        assert_eq!(decode_state(r#"{"o":"one"}"#), None);
        assert_eq!(decode_state(r#"{"o":0,"s":9}"#), None);
    }
}
