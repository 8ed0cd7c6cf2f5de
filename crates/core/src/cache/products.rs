//! Product record persistence.
//!
//! List fields are stored as JSON arrays and `scraped_at` as RFC3339 UTC with
//! microsecond precision, so stored timestamps order correctly as text and a
//! record reads back equal to the one written.

use super::connection::CacheDb;
use crate::{Error, ProductRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Keyed persistence for product records.
///
/// The engine talks to the cache only through this trait. Implementations
/// must be safe to share across concurrent extractions.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Load the record stored under `url`, if any.
    async fn get(&self, url: &str) -> Result<Option<ProductRecord>, Error>;

    /// Insert or replace the record stored under `record.url`.
    async fn upsert(&self, record: &ProductRecord) -> Result<(), Error>;

    /// Remove the record stored under `url`. Returns whether a row existed.
    async fn delete(&self, url: &str) -> Result<bool, Error>;
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::CorruptEntry(format!("scraped_at {raw:?}: {e}")))
}

/// Raw column values, decoded outside the rusqlite row closure.
struct ProductRow {
    url: String,
    title: Option<String>,
    price: Option<String>,
    images: String,
    sizes: String,
    colors: String,
    brand: Option<String>,
    description: Option<String>,
    scraped_at: String,
}

impl TryFrom<ProductRow> for ProductRecord {
    type Error = Error;

    fn try_from(row: ProductRow) -> Result<Self, Error> {
        Ok(ProductRecord {
            url: row.url,
            title: row.title,
            price: row.price,
            images: serde_json::from_str(&row.images)?,
            sizes: serde_json::from_str(&row.sizes)?,
            colors: serde_json::from_str(&row.colors)?,
            brand: row.brand,
            description: row.description,
            scraped_at: parse_ts(&row.scraped_at)?,
        })
    }
}

#[async_trait]
impl ProductStore for CacheDb {
    async fn get(&self, url: &str) -> Result<Option<ProductRecord>, Error> {
        let url = url.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<ProductRow>, Error> {
                let result = conn.query_row(
                    "SELECT url, title, price, images, sizes, colors, brand, description, scraped_at
                     FROM product_cache WHERE url = ?1",
                    params![url],
                    |row| {
                        Ok(ProductRow {
                            url: row.get(0)?,
                            title: row.get(1)?,
                            price: row.get(2)?,
                            images: row.get(3)?,
                            sizes: row.get(4)?,
                            colors: row.get(5)?,
                            brand: row.get(6)?,
                            description: row.get(7)?,
                            scraped_at: row.get(8)?,
                        })
                    },
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(ProductRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &ProductRecord) -> Result<(), Error> {
        let images = serde_json::to_string(&record.images)?;
        let sizes = serde_json::to_string(&record.sizes)?;
        let colors = serde_json::to_string(&record.colors)?;
        let scraped_at = format_ts(record.scraped_at);
        let record = record.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO product_cache (
                        url, title, price, images, sizes, colors, brand, description, scraped_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                    ON CONFLICT(url) DO UPDATE SET
                        title = excluded.title,
                        price = excluded.price,
                        images = excluded.images,
                        sizes = excluded.sizes,
                        colors = excluded.colors,
                        brand = excluded.brand,
                        description = excluded.description,
                        scraped_at = excluded.scraped_at",
                    params![
                        &record.url,
                        &record.title,
                        &record.price,
                        images,
                        sizes,
                        colors,
                        &record.brand,
                        &record.description,
                        scraped_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, url: &str) -> Result<bool, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM product_cache WHERE url = ?1", params![url])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

impl CacheDb {
    /// Delete records older than `ttl` at `now`, plus records with neither title nor images.
    ///
    /// Returns the number of rows removed.
    pub async fn purge_expired_products(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, Error> {
        let cutoff = format_ts(now - ttl);
        let purged = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                let deleted = conn.execute(
                    "DELETE FROM product_cache
                     WHERE scraped_at < ?1
                        OR ((title IS NULL OR trim(title) = '') AND images = '[]')",
                    params![cutoff],
                )?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from)?;

        tracing::info!(purged, "purged expired product records");
        Ok(purged)
    }

    /// Number of cached product records.
    pub async fn count_products(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM product_cache", [], |row| row.get(0))?;
                Ok(count.max(0) as u64)
            })
            .await
            .map_err(Error::from)
    }
}
