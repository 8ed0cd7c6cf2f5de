//! Canonical product record and extraction request types.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;

/// The canonical output of an extraction.
///
/// `url` is the cache key. `images` is ordered by discovery and holds no
/// duplicates; `sizes` and `colors` are deduplicated but keep first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub title: Option<String>,
    pub price: Option<String>,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl ProductRecord {
    /// An empty record for `url`, stamped at `scraped_at`.
    ///
    /// The timestamp is truncated to microseconds, the precision the cache
    /// stores, so a record read back from the cache compares equal.
    pub fn new(url: impl Into<String>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            title: None,
            price: None,
            images: Vec::new(),
            sizes: Vec::new(),
            colors: Vec::new(),
            brand: None,
            description: None,
            scraped_at: scraped_at.trunc_subsecs(6),
        }
    }

    /// A record carries data when it has a non-blank title or any image.
    pub fn has_data(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty()) || !self.images.is_empty()
    }

    /// Age of the record relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.scraped_at
    }

    /// Whether this record may be served from cache at `now`.
    ///
    /// Valid iff it carries data and `now - scraped_at <= ttl`. A forced
    /// refresh never consults this.
    pub fn is_valid_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.has_data() && self.age(now) <= ttl
    }
}

/// A request to extract product data for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub url: Url,
    pub force_refresh: bool,
}

impl ExtractionRequest {
    /// Build a request, rejecting anything that is not an absolute http(s) URL.
    pub fn new(url: &str, force_refresh: bool) -> Result<Self, Error> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidUrl("URL is required".into()));
        }

        let mut parsed = Url::parse(trimmed).map_err(|e| Error::InvalidUrl(format!("{trimmed}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {}", parsed.scheme())));
        }
        if parsed.host_str().is_none() {
            return Err(Error::InvalidUrl(format!("{trimmed}: missing host")));
        }
        parsed.set_fragment(None);

        Ok(Self { url: parsed, force_refresh })
    }

    /// The cache key for this request.
    pub fn cache_key(&self) -> &str {
        self.url.as_str()
    }
}
