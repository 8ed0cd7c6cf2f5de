//! Embedded script tier.
//!
//! Mines inline `<script>` bodies for CDN image URLs, `image: "..."`
//! assignments and JSON object literals keyed by `product` or `images`.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::fields::ProductDraft;
use super::images;
use prodex_core::Error;

const TIER: &str = "scripts";

/// Upper bound on JSON candidates tried per page.
const MAX_JSON_ATTEMPTS: usize = 64;

static INLINE_SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script:not([src])").expect("inline script selector"));

static IMAGE_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?image["']?\s*[:=]\s*["'](https?://[^"']+?\.(?:jpe?g|png|webp)[^"']*)["']"#)
        .expect("image assignment pattern")
});

static JSON_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:product|images)"\s*:"#).expect("json key pattern"));

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseText {
    Text(String),
    Number(serde_json::Number),
}

impl LooseText {
    fn into_string(self) -> String {
        match self {
            LooseText::Text(text) => text,
            LooseText::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseImage {
    Url(String),
    Object {
        #[serde(alias = "src")]
        url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LooseLabel {
    Text(String),
    Object { name: Option<String> },
}

/// Product fields recovered from a script object literal.
#[derive(Debug, Default, Deserialize)]
struct ScriptProduct {
    #[serde(alias = "title")]
    name: Option<String>,
    price: Option<LooseText>,
    #[serde(default)]
    images: Vec<LooseImage>,
    description: Option<String>,
    #[serde(default)]
    sizes: Vec<LooseLabel>,
    #[serde(default)]
    colors: Vec<LooseLabel>,
}

/// Regex matching absolute URLs on any of the trusted CDN hosts.
fn cdn_pattern(trusted_hosts: &[&str]) -> Option<Regex> {
    if trusted_hosts.is_empty() {
        return None;
    }
    let hosts: Vec<String> = trusted_hosts.iter().map(|h| regex::escape(h)).collect();
    let pattern = format!(r#"https?://(?:[a-z0-9-]+\.)*(?:{})/[^"'\s\\<>)]+"#, hosts.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "invalid CDN pattern");
            None
        }
    }
}

/// End index (exclusive) of the balanced JSON object starting at `start`.
fn balanced_object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text.get(start..)?.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Parsed JSON objects in `script` that contain a `product` or `images` key.
///
/// Objects are tried outermost first; once one parses, scanning resumes after it.
fn json_candidates(script: &str, budget: &mut usize) -> Vec<Value> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while *budget > 0 {
        let Some(rel) = script.get(cursor..).and_then(|rest| rest.find('{')) else {
            break;
        };
        let start = cursor + rel;
        let Some(end) = balanced_object_end(script, start) else {
            cursor = start + 1;
            continue;
        };

        let slice = &script[start..end];
        if !JSON_KEY.is_match(slice) {
            cursor = end;
            continue;
        }

        *budget -= 1;
        match serde_json::from_str::<Value>(slice) {
            Ok(value) => {
                found.push(value);
                cursor = end;
            }
            Err(e) => {
                let err = Error::ParseFailure { tier: TIER.into(), reason: e.to_string() };
                tracing::debug!(error = %err, "script object did not parse");
                cursor = start + 1;
            }
        }
    }

    found
}

/// Read product fields out of a recovered JSON value.
fn product_from_value(value: &Value) -> Option<ScriptProduct> {
    let node = value.get("product").filter(|p| p.is_object()).unwrap_or(value);
    match ScriptProduct::deserialize(node) {
        Ok(product) => Some(product),
        Err(e) => {
            let err = Error::ParseFailure { tier: TIER.into(), reason: e.to_string() };
            tracing::debug!(error = %err, "script object has unexpected shape");
            None
        }
    }
}

/// Run the embedded script tier.
pub fn extract(doc: &Html, page: &Url, trusted_hosts: &[&str]) -> ProductDraft {
    let mut draft = ProductDraft::default();
    let cdn = cdn_pattern(trusted_hosts);
    let mut budget = MAX_JSON_ATTEMPTS;

    let bodies: Vec<String> =
        doc.select(&INLINE_SCRIPT).map(|s| s.text().collect::<String>().replace("\\/", "/")).collect();

    for body in &bodies {
        let literal_urls = cdn
            .iter()
            .flat_map(|re| re.find_iter(body).map(|m| m.as_str().to_string()))
            .chain(IMAGE_ASSIGNMENT.captures_iter(body).filter_map(|c| c.get(1)).map(|m| m.as_str().to_string()));
        for candidate in literal_urls {
            if let Some(canonical) = images::normalize(&candidate, page, trusted_hosts) {
                draft.push_image(canonical);
            }
        }
    }

    for body in &bodies {
        for value in json_candidates(body, &mut budget) {
            let Some(product) = product_from_value(&value) else {
                continue;
            };
            absorb_script_product(&mut draft, product, page, trusted_hosts);
        }
    }

    tracing::debug!(tier = TIER, images = draft.images.len(), title = draft.title.is_some(), "tier complete");
    draft
}

fn absorb_script_product(draft: &mut ProductDraft, product: ScriptProduct, page: &Url, trusted_hosts: &[&str]) {
    let mut found = ProductDraft {
        title: product.name,
        price: product.price.map(LooseText::into_string),
        description: product.description,
        ..Default::default()
    };

    let urls = product.images.into_iter().filter_map(|image| match image {
        LooseImage::Url(url) => Some(url),
        LooseImage::Object { url } => url,
    });
    for candidate in urls {
        if let Some(canonical) = images::normalize(&candidate, page, trusted_hosts) {
            found.push_image(canonical);
        }
    }

    let label = |l: LooseLabel| match l {
        LooseLabel::Text(text) => Some(text),
        LooseLabel::Object { name } => name,
    };
    for size in product.sizes.into_iter().filter_map(label) {
        found.push_size(&size);
    }
    for color in product.colors.into_iter().filter_map(label) {
        found.push_color(&color);
    }

    draft.absorb(found);
}
