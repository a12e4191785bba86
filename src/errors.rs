//! # Dictionary Error Types Module
//!
//! Error types for requests made to dexonline.

/// Errors raised while fetching definitions from dexonline
#[derive(Debug, Clone)]
pub enum DexError {
    /// Connection, timeout or transport errors
    Network(String),
    /// Non-success HTTP status
    Status(u16),
    /// The response body was not the expected JSON
    Decode(String),
    /// Too many recent failures, requests are short-circuited
    CircuitOpen,
}

impl DexError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DexError::Network(_) => true,
            DexError::Status(status) => *status >= 500 || *status == 429,
            DexError::Decode(_) | DexError::CircuitOpen => false,
        }
    }
}

impl std::fmt::Display for DexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DexError::Network(msg) => write!(f, "Network error: {msg}"),
            DexError::Status(status) => write!(f, "Unexpected HTTP status: {status}"),
            DexError::Decode(msg) => write!(f, "Decode error: {msg}"),
            DexError::CircuitOpen => write!(f, "dexonline is temporarily unavailable"),
        }
    }
}

impl std::error::Error for DexError {}

impl From<reqwest::Error> for DexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DexError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DexError::Status(status.as_u16())
        } else {
            DexError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DexError {
    fn from(err: serde_json::Error) -> Self {
        DexError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_formatting() {
        assert_eq!(
            DexError::Network("connection reset".to_string()).to_string(),
            "Network error: connection reset"
        );
        assert_eq!(DexError::Status(502).to_string(), "Unexpected HTTP status: 502");
    }

    #[test]
    fn test_transient_classification() {
        assert!(DexError::Network("timeout".to_string()).is_transient());
        assert!(DexError::Status(503).is_transient());
        assert!(DexError::Status(429).is_transient());
        assert!(!DexError::Status(404).is_transient());
        assert!(!DexError::Decode("eof".to_string()).is_transient());
        assert!(!DexError::CircuitOpen.is_transient());
    }
}
