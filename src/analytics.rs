//! # Analytics Module
//!
//! Usage events sent to Google Analytics through the measurement protocol.
//! Tracking never blocks or fails a handler: events are sent from a spawned
//! task and errors are only logged.

use tracing::{debug, error};

pub const GOOGLE_ANALYTICS_COLLECT_URL: &str = "https://www.google-analytics.com/collect";
const USER_AGENT: &str = "DexRoBot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsType {
    EmptyQuery,
    InlineQuery,
    Command,
    Message,
}

impl AnalyticsType {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyticsType::EmptyQuery => "empty_query",
            AnalyticsType::InlineQuery => "inline_query",
            AnalyticsType::Command => "command",
            AnalyticsType::Message => "message",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Analytics {
    http: reqwest::Client,
    google_analytics_id: Option<String>,
}

impl Analytics {
    pub fn new(google_analytics_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            google_analytics_id,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.google_analytics_id.is_some()
    }

    /// Query parameters of one event hit
    pub fn event_params(
        tracking_id: &str,
        analytics_type: AnalyticsType,
        user_id: u64,
        data: &str,
    ) -> Vec<(&'static str, String)> {
        vec![
            ("v", "1".to_string()),
            ("t", "event".to_string()),
            ("tid", tracking_id.to_string()),
            ("cid", user_id.to_string()),
            ("ec", analytics_type.as_str().to_string()),
            ("ea", data.to_string()),
        ]
    }

    /// Record an event in the background. Does nothing when no tracking id is configured.
    pub fn track(&self, analytics_type: AnalyticsType, user_id: u64, data: &str) {
        let Some(tracking_id) = &self.google_analytics_id else {
            return;
        };

        let params = Self::event_params(tracking_id, analytics_type, user_id, data);
        let http = self.http.clone();

        tokio::spawn(async move {
            let result = http
                .get(GOOGLE_ANALYTICS_COLLECT_URL)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .query(&params)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(event = analytics_type.as_str(), user_id, "Analytics event sent");
                }
                Ok(response) => {
                    error!(status = %response.status(), "Google analytics error");
                }
                Err(e) => {
                    error!(error = %e, "Google analytics request failed");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(AnalyticsType::EmptyQuery.as_str(), "empty_query");
        assert_eq!(AnalyticsType::InlineQuery.as_str(), "inline_query");
        assert_eq!(AnalyticsType::Command.as_str(), "command");
        assert_eq!(AnalyticsType::Message.as_str(), "message");
    }

    #[test]
    fn test_event_params() {
        let params = Analytics::event_params("UA-1", AnalyticsType::Message, 42, "casă");

        assert!(params.contains(&("tid", "UA-1".to_string())));
        assert!(params.contains(&("cid", "42".to_string())));
        assert!(params.contains(&("ec", "message".to_string())));
        assert!(params.contains(&("ea", "casă".to_string())));
    }

    #[test]
    fn test_disabled_tracking_is_a_no_op() {
        // Runs outside a tokio runtime: spawning would panic if tracking were attempted
        let analytics = Analytics::new(None);

        assert!(!analytics.is_enabled());
        analytics.track(AnalyticsType::Command, 1, "/users");
    }
}
