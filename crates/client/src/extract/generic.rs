//! Generic fallback strategy for unrecognized domains.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use super::fields::{MAX_IMAGES, ProductDraft, element_text, first_non_empty, select_text};
use super::selectors::is_size_token;
use super::{ProductExtractor, StrategyId, images};

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("img selector"));
static ANY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body *").expect("universal selector"));

/// Plain DOM heuristics; never infers a brand.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

fn class_contains(element: &scraper::node::Element, needle: &str) -> bool {
    element.attr("class").is_some_and(|class| class.to_ascii_lowercase().contains(needle))
}

impl DefaultExtractor {
    fn images(doc: &Html, page: &Url, draft: &mut ProductDraft) {
        let sources = doc.select(&IMG).filter_map(|img| {
            let el = img.value();
            ["src", "data-src", "data-lazy-src"].into_iter().find_map(|attr| el.attr(attr).filter(|v| !v.trim().is_empty()))
        });
        for candidate in sources.take(MAX_IMAGES) {
            if let Some(canonical) = images::normalize(candidate, page, &[]) {
                draft.push_image(canonical);
            }
        }
    }

    fn sizes(doc: &Html, draft: &mut ProductDraft) {
        let tokens = doc.root_element().text().map(str::trim).filter(|t| is_size_token(t));
        for token in tokens {
            draft.push_size(token);
        }
    }

    fn classed_text(doc: &Html, needle: &str) -> impl Iterator<Item = String> {
        doc.select(&ANY).filter(move |el| class_contains(el.value(), needle)).map(element_text)
    }
}

impl ProductExtractor for DefaultExtractor {
    fn id(&self) -> StrategyId {
        StrategyId::Generic
    }

    fn can_handle(&self, _url: &Url) -> bool {
        true
    }

    fn harvest(&self, url: &Url, html: &str) -> ProductDraft {
        let doc = Html::parse_document(html);
        let mut draft = ProductDraft {
            title: first_non_empty(["h1", "title"].into_iter().map(|css| select_text(&doc, css))),
            price: first_non_empty(Self::classed_text(&doc, "price").map(Some)),
            ..Default::default()
        };

        Self::images(&doc, url, &mut draft);
        Self::sizes(&doc, &mut draft);
        for color in Self::classed_text(&doc, "color") {
            draft.push_color(&color);
        }

        tracing::debug!(
            strategy = "generic",
            images = draft.images.len(),
            sizes = draft.sizes.len(),
            title = draft.title.is_some(),
            "harvest complete"
        );
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prodex_core::Error;

    fn url() -> Url {
        Url::parse("https://generic-shop.example/item/1").unwrap()
    }

    #[test]
    fn test_generic_page() {
        let html = r#"<html><head><title>Shop | Blue Jacket</title></head><body>
            <h1>Blue Jacket</h1>
            <span class="product-price">$120.00</span>
            <img src="/img/front.jpg?w=400">
            <img data-src="https://cdn.generic-shop.example/back.png">
            <img src="side.webp">
            <ul><li>S</li><li>M</li><li>m</li><li>Large</li></ul>
            <span class="color-name">Navy</span>
            <span class="color-label">Color</span>
        </body></html>"#;

        let record = DefaultExtractor.extract(&url(), html, Utc::now()).unwrap();

        assert_eq!(record.title.as_deref(), Some("Blue Jacket"));
        assert_eq!(record.price.as_deref(), Some("$120.00"));
        assert_eq!(record.brand, None);
        assert_eq!(
            record.images,
            vec![
                "https://generic-shop.example/img/front.jpg",
                "https://cdn.generic-shop.example/back.png",
                "https://generic-shop.example/item/side.webp",
            ]
        );
        assert_eq!(record.sizes, vec!["S", "M"]);
        assert_eq!(record.colors, vec!["Navy"]);
    }

    #[test]
    fn test_title_falls_back_to_document_title() {
        let draft = DefaultExtractor.harvest(&url(), "<html><head><title> Canvas Tote </title></head><body></body></html>");
        assert_eq!(draft.title.as_deref(), Some("Canvas Tote"));
    }

    #[test]
    fn test_image_cap() {
        let imgs: String = (0..40).map(|i| format!(r#"<img src="/p/{i}.jpg">"#)).collect();
        let draft = DefaultExtractor.harvest(&url(), &format!("<html><body><h1>X</h1>{imgs}</body></html>"));
        assert_eq!(draft.images.len(), MAX_IMAGES);
    }

    #[test]
    fn test_no_data_found() {
        let err = DefaultExtractor.extract(&url(), "<html><body><p>nothing</p></body></html>", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::NoDataFound { ref strategy, .. } if strategy == "generic"));
    }

    #[test]
    fn test_handles_everything() {
        assert!(DefaultExtractor.can_handle(&url()));
        assert_eq!(DefaultExtractor.id(), StrategyId::Generic);
    }
}
