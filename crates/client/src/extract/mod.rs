//! Product extraction strategies.
//!
//! ### Strategies
//! - [`DefaultExtractor`] handles any URL with plain DOM heuristics.
//! - [`BrandExtractor`] runs a tiered cascade for one retailer, described by
//!   a static [`BrandProfile`].
//!
//! ### Tiers (brand cascade)
//! 1. `structured`: `Product` / `ItemPage` JSON-LD.
//! 2. `scripts`: CDN literals and JSON object literals in inline scripts, only
//!    when tier 1 found nothing.
//! 3. `selectors`: ordered per-field selector lists, image harvesting and the
//!    attribute scan, merged in when earlier tiers are insufficient.
//!
//! Tier failures are logged and treated as "no match"; only a strategy that
//! ends with neither title nor image reports `NoDataFound`.

pub mod brand;
pub mod fields;
pub mod generic;
pub mod images;
pub mod scripts;
pub mod selectors;
pub mod structured;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

pub use brand::{BrandExtractor, BrandProfile};
pub use fields::{ProductDraft, first_non_empty};
pub use generic::DefaultExtractor;

use crate::fetch::Fetcher;
use prodex_core::{Error, ProductRecord};

/// Identifies the strategy chosen for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyId {
    Generic,
    Brand(&'static str),
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyId::Generic => f.write_str("generic"),
            StrategyId::Brand(id) => f.write_str(id),
        }
    }
}

/// A pluggable extraction algorithm for one brand or the generic fallback.
#[async_trait::async_trait]
pub trait ProductExtractor: Send + Sync {
    fn id(&self) -> StrategyId;

    /// Whether this strategy is responsible for `url`. Pure; no I/O.
    fn can_handle(&self, url: &Url) -> bool;

    /// Run every tier over `html` and return whatever was found.
    fn harvest(&self, url: &Url, html: &str) -> ProductDraft;

    /// Extract a record from already-fetched `html`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoDataFound` when no title and no image were found.
    fn extract(&self, url: &Url, html: &str, scraped_at: DateTime<Utc>) -> Result<ProductRecord, Error> {
        let draft = self.harvest(url, html);
        if !draft.has_data() {
            return Err(Error::NoDataFound { url: url.to_string(), strategy: self.id().to_string() });
        }
        tracing::info!(
            url = %url,
            strategy = %self.id(),
            images = draft.images.len(),
            sizes = draft.sizes.len(),
            "extracted product"
        );
        Ok(draft.into_record(url.as_str(), scraped_at))
    }

    /// Fetch `url` and extract a record from the response.
    async fn scrape(
        &self, url: &Url, fetcher: &dyn Fetcher, timeout: Duration, scraped_at: DateTime<Utc>,
    ) -> Result<ProductRecord, Error> {
        let html = fetcher.fetch(url, timeout, true).await?;
        self.extract(url, &html, scraped_at)
    }
}
