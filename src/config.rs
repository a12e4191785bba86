//! # Configuration Module
//!
//! This module defines configuration structures for the bot: Telegram and
//! database settings loaded from the environment, dexonline client settings,
//! recovery settings and rendering limits.

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

// Constants for bot configuration
pub const DEFAULT_DEX_BASE_URL: &str = "https://dexonline.ro";
/// Maximum length of a Telegram message text, per the Bot API documentation
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4096;
/// Maximum size of inline keyboard callback data in bytes
pub const CALLBACK_DATA_LIMIT: usize = 64;
pub const MESSAGE_TITLE_LENGTH_LIMIT: usize = 50;
pub const MESSAGES_COUNT_LIMIT: usize = 50;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 60 * 60; // 1 day
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
pub const DEFAULT_WORD_OF_THE_DAY_HOUR: u32 = 9;
pub const DEFAULT_ERROR_LOG_PATH: &str = "errors.log";

/// Recovery configuration for dexonline requests
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 250,
            max_retry_delay_ms: 2000,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Settings for the dexonline client
#[derive(Debug, Clone)]
pub struct DexConfig {
    /// Site root, without trailing slash
    pub base_url: String,
    pub http_timeout_ms: u64,
    /// How long a fetched response stays in the cache
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    /// Debug override: only keep the definition with this index
    pub debug_index: Option<usize>,
    /// Debug override: render this markup instead of querying dexonline
    pub debug_fragment: Option<String>,
    pub recovery: RecoveryConfig,
}

impl Default for DexConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DEX_BASE_URL.to_string(),
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            debug_index: None,
            debug_fragment: None,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl DexConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Limits used when rendering definitions into messages
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub max_message_length: usize,
    pub title_length_limit: usize,
    /// Prefix titles with the definition index and log every rendered body
    pub debug: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            title_length_limit: MESSAGE_TITLE_LENGTH_LIMIT,
            debug: false,
        }
    }
}

/// Top-level bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub database_url: String,
    pub admin_user_id: Option<u64>,
    pub google_analytics_id: Option<String>,
    /// Hour of the day (0-23, local time) when the word of the day is broadcast
    pub word_of_the_day_hour: u32,
    pub json_logs: bool,
    pub error_log_path: String,
    pub dex: DexConfig,
    pub render: RenderConfig,
}

impl Config {
    /// Load the configuration from the process environment, reading `.env` first
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let bot_token =
            env::var("TELEGRAM_BOT_TOKEN").context("TELEGRAM_BOT_TOKEN must be set")?;
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let debug = env_flag("DEBUG");

        let dex = DexConfig {
            base_url: env::var("DEX_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_DEX_BASE_URL.to_string()),
            http_timeout_ms: env_parse("HTTP_TIMEOUT_MS", DEFAULT_HTTP_TIMEOUT_MS)?,
            cache_ttl_secs: env_parse("CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            debug_index: env_optional("DEBUG_INDEX")?,
            debug_fragment: env::var("DEBUG_FRAGMENT").ok().filter(|f| !f.is_empty()),
            ..DexConfig::default()
        };

        let render = RenderConfig {
            max_message_length: env_parse("MAX_MESSAGE_LENGTH", DEFAULT_MAX_MESSAGE_LENGTH)?,
            debug,
            ..RenderConfig::default()
        };

        let word_of_the_day_hour =
            env_parse("WORD_OF_THE_DAY_HOUR", DEFAULT_WORD_OF_THE_DAY_HOUR)?;
        if word_of_the_day_hour > 23 {
            anyhow::bail!("WORD_OF_THE_DAY_HOUR must be between 0 and 23");
        }

        Ok(Self {
            bot_token,
            database_url,
            admin_user_id: env_optional("ADMIN_USER_ID")?,
            google_analytics_id: env::var("GOOGLE_ANALYTICS_ID").ok().filter(|id| !id.is_empty()),
            word_of_the_day_hour,
            json_logs: env::var("LOG_FORMAT")
                .map(|format| format.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            error_log_path: env::var("ERROR_LOG_PATH")
                .unwrap_or_else(|_| DEFAULT_ERROR_LOG_PATH.to_string()),
            dex,
            render,
        })
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_user_id == Some(user_id)
    }
}

fn env_flag(key: &str) -> bool {
    matches!(
        env::var(key).map(|v| v.to_ascii_lowercase()).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}

fn env_optional<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a number")),
        _ => Ok(None),
    }
}
