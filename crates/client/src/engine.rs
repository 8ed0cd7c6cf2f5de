//! The extraction entry point: cache lookup, strategy selection, fetch, upsert.
//!
//! ### Cache states
//! - **Hit**: a record with data, no older than the TTL. Returned as-is; nothing is fetched.
//! - **Expired** / **Invalid**: the entry is deleted and the URL re-extracted.
//! - **Miss**: extracted directly.
//! - **Forced**: any entry is deleted unconditionally, then re-extracted.
//!
//! A fresh record always replaces the stored one wholesale. Cache failures are
//! logged and never surface; the caller only sees extraction errors.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use url::Url;

use crate::extract::StrategyId;
use crate::fetch::{FetchClient, Fetcher};
use crate::registry::ExtractorRegistry;
use prodex_core::{AppConfig, CacheDb, Error, ExtractionRequest, ProductRecord, ProductStore};

/// Outcome of checking the cache for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(ProductRecord),
    Expired,
    Invalid,
    Miss,
    Forced,
}

impl CacheLookup {
    fn label(&self) -> &'static str {
        match self {
            CacheLookup::Hit(_) => "hit",
            CacheLookup::Expired => "expired",
            CacheLookup::Invalid => "invalid",
            CacheLookup::Miss => "miss",
            CacheLookup::Forced => "forced",
        }
    }
}

/// Resilient product extraction over a cache, a fetcher and a strategy registry.
pub struct ProductEngine {
    registry: ExtractorRegistry,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ProductStore>,
    ttl: chrono::Duration,
    timeout: Duration,
}

impl ProductEngine {
    pub fn new(
        registry: ExtractorRegistry, fetcher: Arc<dyn Fetcher>, store: Arc<dyn ProductStore>, ttl: chrono::Duration,
        timeout: Duration,
    ) -> Self {
        Self { registry, fetcher, store, ttl, timeout }
    }

    /// Wire the engine from configuration: SQLite cache, reqwest fetcher, built-in brands.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let store = CacheDb::open(&config.db_path).await?;
        let fetcher = FetchClient::new(config)?;
        Ok(Self::new(
            ExtractorRegistry::with_defaults(&config.augment),
            Arc::new(fetcher),
            Arc::new(store),
            config.cache_ttl(),
            config.timeout(),
        ))
    }

    /// Identifier of the strategy that would handle `url`.
    pub fn select_strategy(&self, url: &Url) -> StrategyId {
        self.registry.select_strategy(url)
    }

    /// Extract the product at `req.url`, serving from cache when valid.
    pub async fn extract(&self, req: &ExtractionRequest) -> Result<ProductRecord, Error> {
        self.extract_at(req, Utc::now()).await
    }

    /// [`extract`](Self::extract) with an explicit clock.
    pub async fn extract_at(&self, req: &ExtractionRequest, now: DateTime<Utc>) -> Result<ProductRecord, Error> {
        let key = req.cache_key();
        let lookup = self.lookup(key, req.force_refresh, now).await;
        tracing::info!(url = key, cache = lookup.label(), "cache decision");

        match lookup {
            CacheLookup::Hit(record) => return Ok(record),
            CacheLookup::Miss => {}
            CacheLookup::Expired | CacheLookup::Invalid | CacheLookup::Forced => self.discard(key).await,
        }

        let strategy = self.registry.get_extractor(&req.url);
        tracing::debug!(url = key, strategy = %strategy.id(), "extracting");
        let record = strategy.scrape(&req.url, self.fetcher.as_ref(), self.timeout, now).await?;

        if let Err(e) = self.store.upsert(&record).await {
            tracing::warn!(url = key, error = %e, "failed to cache product record");
        }

        Ok(record)
    }

    async fn lookup(&self, key: &str, force_refresh: bool, now: DateTime<Utc>) -> CacheLookup {
        if force_refresh {
            return CacheLookup::Forced;
        }

        match self.store.get(key).await {
            Ok(None) => CacheLookup::Miss,
            Ok(Some(record)) if record.is_valid_at(now, self.ttl) => CacheLookup::Hit(record),
            Ok(Some(record)) if record.has_data() => CacheLookup::Expired,
            Ok(Some(_)) => CacheLookup::Invalid,
            Err(e) => {
                tracing::warn!(url = key, error = %e, "unreadable cache entry; treating as invalid");
                CacheLookup::Invalid
            }
        }
    }

    async fn discard(&self, key: &str) {
        match self.store.delete(key).await {
            Ok(existed) => tracing::debug!(url = key, existed, "discarded cache entry"),
            Err(e) => tracing::warn!(url = key, error = %e, "failed to delete cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one page for every URL, or fails when `html` is `None`.
    struct PageFetcher {
        html: Option<String>,
        calls: AtomicUsize,
    }

    impl PageFetcher {
        fn serving(html: &str) -> Arc<Self> {
            Arc::new(Self { html: Some(html.to_string()), calls: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { html: None, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Fetcher for PageFetcher {
        async fn fetch(&self, url: &Url, _timeout: Duration, _allow_retry: bool) -> Result<String, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.html
                .clone()
                .ok_or_else(|| Error::FetchFailure { url: url.to_string(), reason: "connection reset".into() })
        }
    }

    /// Store whose reads and writes always fail, recording deletes.
    #[derive(Default)]
    struct BrokenStore {
        deletes: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ProductStore for BrokenStore {
        async fn get(&self, _url: &str) -> Result<Option<ProductRecord>, Error> {
            Err(Error::CorruptEntry("bad row".into()))
        }

        async fn upsert(&self, _record: &ProductRecord) -> Result<(), Error> {
            Err(Error::MigrationFailed("read-only".into()))
        }

        async fn delete(&self, url: &str) -> Result<bool, Error> {
            self.deletes.lock().unwrap().push(url.to_string());
            Ok(false)
        }
    }

    const GENERIC_URL: &str = "https://generic-shop.example/item/1";
    const JACKET: &str = r#"<html><head><title>Shop</title></head><body>
        <h1>Blue Jacket</h1>
        <span class="price">$120.00</span>
        <img src="/img/front.jpg">
        <ul><li>S</li><li>M</li></ul>
    </body></html>"#;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00.123456Z").unwrap().with_timezone(&Utc)
    }

    async fn engine_with(fetcher: Arc<PageFetcher>) -> (ProductEngine, Arc<CacheDb>) {
        let db = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let engine = ProductEngine::new(
            ExtractorRegistry::default(),
            fetcher,
            db.clone(),
            chrono::Duration::days(3),
            Duration::from_secs(5),
        );
        (engine, db)
    }

    fn request(url: &str, force_refresh: bool) -> ExtractionRequest {
        ExtractionRequest::new(url, force_refresh).unwrap()
    }

    #[tokio::test]
    async fn test_repeated_extraction_is_served_from_cache() {
        let fetcher = PageFetcher::serving(JACKET);
        let (engine, _db) = engine_with(fetcher.clone()).await;
        let req = request(GENERIC_URL, false);

        let first = engine.extract_at(&req, t0()).await.unwrap();
        let second = engine.extract_at(&req, t0() + chrono::Duration::minutes(5)).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
        assert_eq!(first.title.as_deref(), Some("Blue Jacket"));
        assert_eq!(first.images, vec!["https://generic-shop.example/img/front.jpg"]);
    }

    #[tokio::test]
    async fn test_forced_refresh_always_fetches() {
        let fetcher = PageFetcher::serving(JACKET);
        let (engine, db) = engine_with(fetcher.clone()).await;
        let req = request(GENERIC_URL, true);

        let first = engine.extract_at(&req, t0()).await.unwrap();
        let later = t0() + chrono::Duration::seconds(30);
        let second = engine.extract_at(&req, later).await.unwrap();

        assert_eq!(fetcher.calls(), 2);
        assert!(second.scraped_at > first.scraped_at);
        assert_eq!(db.get(GENERIC_URL).await.unwrap().unwrap().scraped_at, later);
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let fetcher = PageFetcher::serving(JACKET);
        let (engine, db) = engine_with(fetcher.clone()).await;
        let req = request(GENERIC_URL, false);

        let fresh = engine.extract_at(&req, t0()).await.unwrap();
        assert_eq!(fresh.scraped_at, t0());

        let hit = engine.extract_at(&req, t0() + chrono::Duration::days(1)).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(hit.scraped_at, t0());

        let day4 = t0() + chrono::Duration::days(4);
        let refetched = engine.extract_at(&req, day4).await.unwrap();
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(refetched.scraped_at, day4);
        assert_eq!(db.get(GENERIC_URL).await.unwrap(), Some(refetched));
        assert_eq!(db.count_products().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_entry_is_replaced() {
        let fetcher = PageFetcher::serving(JACKET);
        let (engine, db) = engine_with(fetcher.clone()).await;
        db.upsert(&ProductRecord::new(GENERIC_URL, t0())).await.unwrap();

        let later = t0() + chrono::Duration::hours(1);
        let record = engine.extract_at(&request(GENERIC_URL, false), later).await.unwrap();

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(record.scraped_at, later);
        assert_eq!(db.get(GENERIC_URL).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces_and_caches_nothing() {
        let fetcher = PageFetcher::failing();
        let (engine, db) = engine_with(fetcher.clone()).await;

        let err = engine.extract_at(&request(GENERIC_URL, false), t0()).await.unwrap_err();

        assert!(matches!(err, Error::FetchFailure { .. }));
        assert!(err.to_string().contains("JavaScript"));
        assert_eq!(db.get(GENERIC_URL).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_page_surfaces_no_data_found() {
        let fetcher = PageFetcher::serving("<html><body><p>Access denied</p></body></html>");
        let (engine, db) = engine_with(fetcher.clone()).await;

        let err = engine.extract_at(&request(GENERIC_URL, false), t0()).await.unwrap_err();

        assert!(matches!(err, Error::NoDataFound { ref strategy, .. } if strategy == "generic"));
        assert_eq!(db.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_brand_page_through_engine() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@type":"Product","name":"Linen Shirt","image":["https://static.zara.net/photos/1.jpg"],
             "offers":{"price":"39.90"}}
            </script></head><body>
            <img src="https://static.zara.net/photos/2.jpg">
            <img src="https://static.zara.net/photos/3.jpg">
            <li class="size-item">S</li><li class="size-item">M</li>
        </body></html>"#;
        let fetcher = PageFetcher::serving(html);
        let (engine, _db) = engine_with(fetcher).await;
        let url = "https://www.zara.com/us/en/linen-shirt-p01234567.html";

        assert_eq!(engine.select_strategy(&Url::parse(url).unwrap()), StrategyId::Brand("zara"));
        let record = engine.extract_at(&request(url, false), t0()).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Linen Shirt"));
        assert_eq!(record.brand.as_deref(), Some("Zara"));
        assert_eq!(record.images.len(), 3);
        assert_eq!(record.images[0], "https://static.zara.net/photos/1.jpg");
        assert_eq!(record.sizes, vec!["S", "M"]);
    }

    #[tokio::test]
    async fn test_store_failures_do_not_surface() {
        let fetcher = PageFetcher::serving(JACKET);
        let store = Arc::new(BrokenStore::default());
        let engine = ProductEngine::new(
            ExtractorRegistry::default(),
            fetcher.clone(),
            store.clone(),
            chrono::Duration::days(3),
            Duration::from_secs(5),
        );

        let record = engine.extract_at(&request(GENERIC_URL, false), t0()).await.unwrap();

        assert_eq!(record.title.as_deref(), Some("Blue Jacket"));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(store.deletes.lock().unwrap().as_slice(), [GENERIC_URL]);
    }

    #[test]
    fn test_lookup_labels() {
        assert_eq!(CacheLookup::Miss.label(), "miss");
        assert_eq!(CacheLookup::Forced.label(), "forced");
    }
}
