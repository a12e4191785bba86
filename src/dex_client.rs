//! # dexonline Client Module
//!
//! Fetches definitions and the word of the day from the dexonline JSON API.
//! Responses are kept in an in-memory LRU cache, transient failures are
//! retried with jittered exponential backoff and a circuit breaker stops
//! requests while dexonline keeps failing.

use chrono::{Datelike, NaiveDate};
use lru::LruCache;
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{DexConfig, RecoveryConfig, DEFAULT_CACHE_CAPACITY};
use crate::definition::RawDefinition;
use crate::errors::DexError;

pub const DEX_API_JSON_PATH: &str = "/json";
pub const DEX_THUMBNAIL_URL: &str = "https://dexonline.ro/img/logo/logo-og.png";
/// Base URL of definitions rendered from a debug fragment
pub const DEBUG_BASE_URL: &str = "debug";

/// Characters left as-is in a URL path segment
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// `{base}/definitie/{query}/json`
pub fn definition_api_url(base_url: &str, query: &str) -> String {
    format!(
        "{}/definitie/{}{}",
        base_url,
        encode_segment(query),
        DEX_API_JSON_PATH
    )
}

/// `{base}/cuvantul-zilei/{yyyy}/{mm}/{dd}/json`
pub fn word_of_the_day_api_url(base_url: &str, date: NaiveDate) -> String {
    format!(
        "{}/cuvantul-zilei/{:04}/{:02}/{:02}{}",
        base_url,
        date.year(),
        date.month(),
        date.day(),
        DEX_API_JSON_PATH
    )
}

/// Full-text search page, offered when a query has no definitions
pub fn search_url(base_url: &str, query: &str) -> String {
    format!("{}/text/{}", base_url, encode_segment(query))
}

/// The page an API URL serves, used as the base of definition URLs
pub fn strip_json_path(api_url: &str) -> &str {
    api_url.strip_suffix(DEX_API_JSON_PATH).unwrap_or(api_url)
}

/// Delay before retry number `attempt` (starting at 1)
pub fn retry_delay(recovery: &RecoveryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay_ms = recovery
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(recovery.max_retry_delay_ms);

    // Up to 25% random jitter
    let jitter_ms = rand::thread_rng().gen_range(0..=delay_ms / 4);
    Duration::from_millis(delay_ms + jitter_ms)
}

#[derive(Debug, Deserialize)]
struct DefinitionsResponse {
    #[serde(default)]
    definitions: Vec<RawDefinition>,
}

/// Definitions found for one query, indexed by their position in the API result
#[derive(Debug, Clone, PartialEq)]
pub struct Definitions {
    /// Page the definitions were found on
    pub base_url: String,
    /// Number of definitions dexonline returned
    pub total: usize,
    pub definitions: Vec<RawDefinition>,
}

impl Definitions {
    /// Assign indexes and apply the debug index override. An out of bounds
    /// override leaves no definitions.
    pub fn from_raw(
        base_url: impl Into<String>,
        mut raw_definitions: Vec<RawDefinition>,
        debug_index: Option<usize>,
    ) -> Self {
        let total = raw_definitions.len();
        for (index, raw_definition) in raw_definitions.iter_mut().enumerate() {
            raw_definition.index = index;
        }

        if let Some(index) = debug_index {
            raw_definitions = if index < total {
                vec![raw_definitions.swap_remove(index)]
            } else {
                warn!(index, total, "Debug index out of bounds");
                Vec::new()
            };
        }

        Self {
            base_url: base_url.into(),
            total,
            definitions: raw_definitions,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions following the one at `offset`, for inline query continuation
    pub fn after_offset(&self, offset: usize) -> Vec<&RawDefinition> {
        if offset >= self.total {
            return Vec::new();
        }
        self.definitions
            .iter()
            .filter(|definition| definition.index > offset)
            .collect()
    }

    pub fn at(&self, index: usize) -> Option<&RawDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.index == index)
    }
}

/// Parse an inline query offset; anything but a number means the first page
pub fn parse_offset(offset: &str) -> Option<usize> {
    offset.trim().parse().ok()
}

/// The word of the day record
#[derive(Debug, Clone, PartialEq)]
pub struct WordOfTheDay {
    pub day: String,
    pub month: String,
    pub year: String,
    pub reason: String,
    pub image_url: Option<String>,
    pub image_author: Option<String>,
    pub definition: RawDefinition,
    /// Page the word of the day was found on
    pub base_url: String,
}

fn scalar_at(value: &Value, pointer: &str) -> Option<String> {
    match value.pointer(pointer)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl WordOfTheDay {
    pub fn from_json(value: &Value, base_url: impl Into<String>) -> Result<Self, DexError> {
        let required = |pointer: &str| {
            scalar_at(value, pointer)
                .ok_or_else(|| DexError::Decode(format!("Missing word of the day field {pointer}")))
        };

        let definition_value = value
            .pointer("/requested/record/definition")
            .cloned()
            .ok_or_else(|| DexError::Decode("Missing word of the day definition".to_string()))?;

        Ok(Self {
            day: required("/day")?,
            month: required("/month")?,
            year: required("/requested/record/year")?,
            reason: scalar_at(value, "/requested/record/reason").unwrap_or_default(),
            image_url: scalar_at(value, "/requested/record/image").filter(|url| !url.is_empty()),
            image_author: scalar_at(value, "/requested/record/imageAuthor")
                .filter(|author| !author.is_empty()),
            definition: serde_json::from_value(definition_value)?,
            base_url: base_url.into(),
        })
    }

    /// Heading placed before the definition body
    pub fn prefix(&self) -> String {
        format!(
            "<b>Cuvântul zilei {}.{}.{}:</b>\n\n",
            self.day, self.month, self.year
        )
    }

    /// Reason the word was picked, placed after the footer
    pub fn suffix(&self) -> String {
        format!(
            "\n\n<b>Cheia alegerii:</b> {}",
            teloxide::utils::html::escape(&self.reason)
        )
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    fetched_at: Instant,
    value: Value,
}

/// HTTP client for the dexonline API
pub struct DexClient {
    http: reqwest::Client,
    config: DexConfig,
    cache: Mutex<LruCache<String, CacheEntry>>,
    circuit_breaker: CircuitBreaker,
}

impl DexClient {
    pub fn new(config: DexConfig) -> Result<Self, DexError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("dexbot/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let capacity = NonZeroUsize::new(config.cache_capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            http,
            cache: Mutex::new(LruCache::new(capacity)),
            circuit_breaker: CircuitBreaker::new(config.recovery.clone()),
            config,
        })
    }

    pub fn config(&self) -> &DexConfig {
        &self.config
    }

    pub fn search_url(&self, query: &str) -> String {
        search_url(&self.config.base_url, query)
    }

    /// Definitions for `query`, or the debug fragment when one is configured
    pub async fn fetch_definitions(&self, query: &str) -> Result<Definitions, DexError> {
        if let Some(fragment) = &self.config.debug_fragment {
            debug!(query = %query, "Rendering debug fragment instead of querying dexonline");
            return Ok(Definitions::from_raw(
                DEBUG_BASE_URL,
                vec![RawDefinition::from_fragment(fragment)],
                self.config.debug_index,
            ));
        }

        let api_url = definition_api_url(&self.config.base_url, query);
        let value = self.get_json(&api_url).await?;
        let response: DefinitionsResponse = serde_json::from_value(value)?;

        Ok(Definitions::from_raw(
            strip_json_path(&api_url),
            response.definitions,
            self.config.debug_index,
        ))
    }

    pub async fn fetch_word_of_the_day(&self, date: NaiveDate) -> Result<WordOfTheDay, DexError> {
        let api_url = word_of_the_day_api_url(&self.config.base_url, date);
        let value = self.get_json(&api_url).await?;

        WordOfTheDay::from_json(&value, strip_json_path(&api_url))
    }

    /// Evict the cached response for `query`. Returns whether there was one.
    pub fn clear_cache(&self, query: &str) -> bool {
        let api_url = definition_api_url(&self.config.base_url, query);
        self.cache.lock().pop(&api_url).is_some()
    }

    fn cached(&self, api_url: &str) -> Option<Value> {
        let mut cache = self.cache.lock();
        match cache.get(api_url) {
            Some(entry) if entry.fetched_at.elapsed() < self.config.cache_ttl() => {
                Some(entry.value.clone())
            }
            Some(_) => {
                cache.pop(api_url);
                None
            }
            None => None,
        }
    }

    fn store(&self, api_url: &str, value: Value) {
        self.cache.lock().put(
            api_url.to_string(),
            CacheEntry {
                fetched_at: Instant::now(),
                value,
            },
        );
    }

    async fn get_json(&self, api_url: &str) -> Result<Value, DexError> {
        if let Some(value) = self.cached(api_url) {
            debug!(url = %api_url, "Serving dexonline response from cache");
            return Ok(value);
        }

        if self.circuit_breaker.is_open() {
            warn!(url = %api_url, "Circuit breaker open, skipping dexonline request");
            return Err(DexError::CircuitOpen);
        }

        let recovery = &self.config.recovery;
        let mut attempt = 0;
        loop {
            match self.get_raw_response(api_url).await {
                Ok(value) => {
                    self.circuit_breaker.record_success();
                    self.store(api_url, value.clone());
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < recovery.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(recovery, attempt);
                    warn!(
                        url = %api_url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "dexonline request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if e.is_transient() {
                        self.circuit_breaker.record_failure();
                    }
                    return Err(e);
                }
            }
        }
    }

    /// dexonline redirects some queries (e.g. diacritics-less spellings) to the
    /// HTML page of the canonical entry; ask for its JSON rendition instead.
    async fn get_raw_response(&self, api_url: &str) -> Result<Value, DexError> {
        let response = self.http.get(api_url).send().await?.error_for_status()?;
        let final_url = response.url().to_string();

        let response = if final_url.ends_with(DEX_API_JSON_PATH) {
            response
        } else {
            info!(url = %api_url, redirected = %final_url, "Following dexonline redirect");
            self.http
                .get(format!("{final_url}{DEX_API_JSON_PATH}"))
                .send()
                .await?
                .error_for_status()?
        };

        Ok(response.json::<Value>().await?)
    }
}
