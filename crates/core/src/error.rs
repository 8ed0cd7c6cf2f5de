//! Unified error types for prodex.
//!
//! Every terminal state of an extraction maps to one of four kinds:
//! `FetchFailure`, `BotDetected`, `ParseFailure` and `NoDataFound`.
//! The remaining variants belong to the cache and request-validation layers.

use tokio_rusqlite::rusqlite;

/// Explanation appended to every error surfaced to a caller of `extract`.
pub const LIKELY_CAUSES: &str = "Possible reasons: 1) the page renders its content with JavaScript, \
    2) product data is loaded dynamically after page load, 3) the page structure changed, \
    4) access was blocked or rate-limited";

/// Unified error types for the extraction engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network or timeout failure after the single retry was spent.
    #[error("FETCH_FAILURE: {url}: {reason}. {causes}", causes = LIKELY_CAUSES)]
    FetchFailure { url: String, reason: String },

    /// Body stayed implausibly small after following the bot-mitigation redirect.
    #[error("BOT_DETECTED: {url} returned only {bytes} bytes after the verification redirect. {causes}", causes = LIKELY_CAUSES)]
    BotDetected { url: String, bytes: usize },

    /// A tier located data but could not parse it.
    #[error("PARSE_FAILURE: {tier}: {reason}")]
    ParseFailure { tier: String, reason: String },

    /// Every tier ran and produced neither a title nor an image.
    #[error("NO_DATA_FOUND: {strategy} found no title or images at {url}. {causes}", causes = LIKELY_CAUSES)]
    NoDataFound { url: String, strategy: String },

    /// Invalid request URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be decoded back into a record.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),
}

impl Error {
    /// Whether retrying the same request later could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::FetchFailure { .. } | Error::BotDetected { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::FetchFailure { url: "https://shop.example/p/1".into(), reason: "timed out".into() };
        let msg = err.to_string();
        assert!(msg.starts_with("FETCH_FAILURE"));
        assert!(msg.contains("https://shop.example/p/1"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn test_surfaced_errors_explain_causes() {
        let errors = [
            Error::FetchFailure { url: "u".into(), reason: "r".into() },
            Error::BotDetected { url: "u".into(), bytes: 1200 },
            Error::NoDataFound { url: "u".into(), strategy: "generic".into() },
        ];
        for err in errors {
            let msg = err.to_string();
            assert!(msg.contains("JavaScript"), "{msg}");
            assert!(msg.contains("blocked"), "{msg}");
        }
    }

    #[test]
    fn test_parse_failure_names_tier() {
        let err = Error::ParseFailure { tier: "structured".into(), reason: "expected value".into() };
        assert_eq!(err.to_string(), "PARSE_FAILURE: structured: expected value");
    }

    #[test]
    fn test_retryable() {
        assert!(Error::BotDetected { url: "u".into(), bytes: 10 }.is_retryable());
        assert!(Error::FetchFailure { url: "u".into(), reason: "r".into() }.is_retryable());
        assert!(!Error::NoDataFound { url: "u".into(), strategy: "s".into() }.is_retryable());
        assert!(!Error::InvalidUrl("x".into()).is_retryable());
    }
}
