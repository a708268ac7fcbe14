//! Viewer configuration.
//!
//! Defaults match the stock viewer page. The JS export accepts the same
//! fields as a JSON object, all optional except the archive name.

use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default debounce between the last keystroke and the search request.
pub const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 300;
/// Queries shorter than this (in characters) never hit the backend.
pub const DEFAULT_MIN_QUERY_CHARS: usize = 2;
/// Period of the URL reconciliation backstop.
pub const DEFAULT_RESYNC_INTERVAL_MS: u64 = 500;
/// Delay before the start-up check that shows the spinner for slow frames.
pub const DEFAULT_SPINNER_PROBE_MS: u64 = 300;

/// Result cap sent with each search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum SearchLimit {
    /// Serialized as `-1`.
    Unbounded,
    AtMost(u32),
}

impl SearchLimit {
    /// Value of the `limit` query parameter.
    pub fn as_param(self) -> i64 {
        match self {
            SearchLimit::Unbounded => -1,
            SearchLimit::AtMost(n) => i64::from(n),
        }
    }
}

impl From<i64> for SearchLimit {
    fn from(raw: i64) -> Self {
        match u32::try_from(raw) {
            Ok(n) if n > 0 => SearchLimit::AtMost(n),
            _ => SearchLimit::Unbounded,
        }
    }
}

impl Default for SearchLimit {
    fn default() -> Self {
        Self::Unbounded
    }
}

/// Everything a [`crate::viewer::Viewer`] needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Archive identifier used in every route.
    pub archive: String,
    pub search_debounce_ms: u64,
    pub min_query_chars: usize,
    pub search_limit: SearchLimit,
    pub resync_interval_ms: u64,
    pub spinner_probe_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            archive: String::new(),
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE_MS,
            min_query_chars: DEFAULT_MIN_QUERY_CHARS,
            search_limit: SearchLimit::Unbounded,
            resync_interval_ms: DEFAULT_RESYNC_INTERVAL_MS,
            spinner_probe_ms: DEFAULT_SPINNER_PROBE_MS,
        }
    }
}

impl ViewerConfig {
    pub fn new(archive: impl Into<String>) -> Self {
        Self {
            archive: archive.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON options object, then force the given archive name.
    pub fn from_json(archive: &str, options: &str) -> Result<Self, ConfigError> {
        let mut config: ViewerConfig = if options.trim().is_empty() {
            ViewerConfig::default()
        } else {
            serde_json::from_str(options).map_err(|e| ConfigError::Options(e.to_string()))?
        };
        config.archive = archive.to_string();
        config.validate()?;
        Ok(config)
    }

    pub fn with_search_debounce(mut self, delay: Duration) -> Self {
        self.search_debounce_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_min_query_chars(mut self, chars: usize) -> Self {
        self.min_query_chars = chars;
        self
    }

    pub fn with_search_limit(mut self, limit: SearchLimit) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn with_resync_interval(mut self, period: Duration) -> Self {
        self.resync_interval_ms = u64::try_from(period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }

    pub fn spinner_probe(&self) -> Duration {
        Duration::from_millis(self.spinner_probe_ms)
    }

    /// Reject configurations the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archive.is_empty() {
            return Err(ConfigError::EmptyArchive);
        }
        if self.archive.contains('/') {
            return Err(ConfigError::InvalidArchive(self.archive.clone()));
        }
        if self.min_query_chars == 0 {
            return Err(ConfigError::NotPositive("min_query_chars"));
        }
        if self.resync_interval_ms == 0 {
            return Err(ConfigError::NotPositive("resync_interval_ms"));
        }
        Ok(())
    }
}
