//! Bot-mitigation redirect detection.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static META_REFRESH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[http-equiv="refresh" i][content]"#).expect("meta refresh selector"));

static REFRESH_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*\d+(?:\.\d+)?\s*[;,]\s*url\s*=\s*['"]?([^'"\s]+)"#).expect("refresh content pattern")
});

/// Target of the first `<meta http-equiv="refresh">` in `body` that names one.
pub fn meta_refresh_target(body: &str) -> Option<String> {
    let doc = Html::parse_document(body);
    doc.select(&META_REFRESH)
        .filter_map(|meta| meta.value().attr("content"))
        .find_map(|content| REFRESH_TARGET.captures(content))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// The verification-redirect target in `body`, when it carries `marker`.
pub fn verification_redirect(body: &str, marker: &str) -> Option<String> {
    meta_refresh_target(body).filter(|target| target.contains(marker))
}
