// ⚙️ Fetch configuration
// Passed explicitly into every component; no process-wide defaults.

use crate::error::{CompareError, CompareResult};
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://www.wikidata.org/w/api.php";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "entity-compare/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/entity-compare/entity-compare)"
);

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Knowledge-base API endpoint
    pub api_url: String,

    /// Language used for labels, descriptions and search (default: "en")
    pub language: String,

    pub user_agent: String,

    /// Per-request timeout (default: 30s)
    pub request_timeout: Duration,

    /// Retries after the first attempt on transient failures (default: 3)
    pub max_retries: u32,

    /// First backoff delay, doubled on every retry (default: 500ms)
    pub backoff_base: Duration,

    /// Upper bound for a single backoff delay (default: 8s)
    pub backoff_max: Duration,

    /// Ids per label-lookup request; the API caps this at 50
    pub label_batch_size: usize,

    /// Label-lookup requests in flight at once (default: 4)
    pub label_concurrency: usize,

    /// Suggestions returned by a search (default: 7)
    pub suggestion_limit: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            api_url: DEFAULT_API_URL.to_string(),
            language: "en".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
            label_batch_size: 50,
            label_concurrency: 4,
            suggestion_limit: 7,
        }
    }
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by WIKIDATA_* environment variables
    pub fn from_env() -> CompareResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = env::var("WIKIDATA_API_URL") {
            config.api_url = url;
        }
        if let Ok(language) = env::var("WIKIDATA_LANGUAGE") {
            config.language = language;
        }
        if let Ok(agent) = env::var("WIKIDATA_USER_AGENT") {
            config.user_agent = agent;
        }
        if let Some(secs) = parse_env::<u64>("WIKIDATA_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_env::<u32>("WIKIDATA_MAX_RETRIES")? {
            config.max_retries = retries;
        }
        if let Some(batch) = parse_env::<usize>("WIKIDATA_BATCH_SIZE")? {
            config.label_batch_size = batch;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_label_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.label_batch_size = batch_size;
        self.label_concurrency = concurrency;
        self
    }

    pub fn validate(&self) -> CompareResult<()> {
        if self.api_url.is_empty() {
            return Err(CompareError::Config("api_url must not be empty".to_string()));
        }
        if self.label_batch_size == 0 || self.label_batch_size > 50 {
            return Err(CompareError::Config(format!(
                "label_batch_size must be within 1..=50, got {}",
                self.label_batch_size
            )));
        }
        if self.label_concurrency == 0 {
            return Err(CompareError::Config(
                "label_concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(CompareError::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        if self.suggestion_limit == 0 {
            return Err(CompareError::Config(
                "suggestion_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay before retry number `attempt` (0-based), exponential and capped
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> CompareResult<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| CompareError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}
