//! Structured metadata tier: `Product` / `ItemPage` JSON-LD blocks.
//!
//! Blocks that fail to parse are logged and skipped; this tier never errors.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::fields::ProductDraft;
use super::images;
use prodex_core::Error;

const TIER: &str = "structured";
const PRODUCT_TYPES: &[&str] = &["Product", "ItemPage"];

static LD_JSON: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("ld+json selector"));

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageRef {
    Url(String),
    Object { url: Option<String> },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PriceValue {
    Text(String),
    Number(serde_json::Number),
}

#[derive(Debug, Default, Deserialize)]
struct Offer {
    price: Option<PriceValue>,
}

/// The subset of a schema.org product this tier reads.
#[derive(Debug, Default, Deserialize)]
struct StructuredProduct {
    name: Option<String>,
    image: Option<OneOrMany<ImageRef>>,
    offers: Option<OneOrMany<Offer>>,
    description: Option<String>,
}

fn is_product_node(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(kind)) => PRODUCT_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).any(|k| PRODUCT_TYPES.contains(&k)),
        _ => false,
    }
}

/// Candidate nodes in a parsed block: the block itself, array members, and `@graph` members.
fn candidate_nodes(block: &Value) -> Vec<&Value> {
    let mut nodes = Vec::new();
    let top: Vec<&Value> = match block {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    for node in top {
        nodes.push(node);
        if let Some(Value::Array(graph)) = node.get("@graph") {
            nodes.extend(graph.iter());
        }
    }
    nodes
}

fn parse_failure(reason: impl std::fmt::Display) {
    let err = Error::ParseFailure { tier: TIER.into(), reason: reason.to_string() };
    tracing::debug!(error = %err, "skipping structured block");
}

/// First product-typed JSON-LD node in the document, as typed fields.
fn find_product(doc: &Html) -> Option<StructuredProduct> {
    for script in doc.select(&LD_JSON) {
        let raw: String = script.text().collect();
        let block: Value = match serde_json::from_str(raw.trim()) {
            Ok(block) => block,
            Err(e) => {
                parse_failure(e);
                continue;
            }
        };

        for node in candidate_nodes(&block).into_iter().filter(|n| is_product_node(n)) {
            match StructuredProduct::deserialize(node) {
                Ok(product) => return Some(product),
                Err(e) => parse_failure(e),
            }
        }
    }
    None
}

/// Run the structured metadata tier.
pub fn extract(doc: &Html, page: &Url, trusted_hosts: &[&str]) -> ProductDraft {
    let Some(product) = find_product(doc) else {
        return ProductDraft::default();
    };

    let mut draft = ProductDraft {
        title: product.name.filter(|n| !n.trim().is_empty()).map(|n| n.trim().to_string()),
        description: product.description.filter(|d| !d.trim().is_empty()).map(|d| d.trim().to_string()),
        ..Default::default()
    };

    draft.price = product.offers.and_then(|offers| offers.into_vec().into_iter().next()).and_then(|offer| {
        offer.price.map(|price| match price {
            PriceValue::Text(text) => text,
            PriceValue::Number(number) => number.to_string(),
        })
    });

    let image_urls = product.image.map(OneOrMany::into_vec).unwrap_or_default().into_iter().filter_map(|image| {
        match image {
            ImageRef::Url(url) => Some(url),
            ImageRef::Object { url } => url,
        }
    });
    for candidate in image_urls {
        if let Some(canonical) = images::normalize(&candidate, page, trusted_hosts) {
            draft.push_image(canonical);
        }
    }

    tracing::debug!(tier = TIER, images = draft.images.len(), title = draft.title.is_some(), "tier complete");
    draft
}
