//! Brand-specific tiered extraction.

mod profile;

pub use profile::BrandProfile;

use scraper::Html;
use url::Url;

use super::fields::ProductDraft;
use super::{ProductExtractor, StrategyId, scripts, selectors, structured};
use crate::fetch::host_matches;
use prodex_core::config::AugmentConfig;

/// Multi-tier cascade for one retailer.
#[derive(Debug, Clone)]
pub struct BrandExtractor {
    profile: &'static BrandProfile,
    augment: AugmentConfig,
}

impl BrandExtractor {
    pub fn new(profile: &'static BrandProfile, augment: AugmentConfig) -> Self {
        Self { profile, augment }
    }

    /// Whether a draft still needs selector harvesting.
    fn insufficient(&self, draft: &ProductDraft) -> bool {
        draft.images.len() < self.augment.min_images || (self.augment.require_sizes && draft.sizes.is_empty())
    }
}

impl ProductExtractor for BrandExtractor {
    fn id(&self) -> StrategyId {
        StrategyId::Brand(self.profile.id)
    }

    fn can_handle(&self, url: &Url) -> bool {
        self.profile.domains.iter().any(|domain| host_matches(url, domain))
    }

    fn harvest(&self, url: &Url, html: &str) -> ProductDraft {
        let doc = Html::parse_document(html);
        let cdn = self.profile.cdn_hosts;

        let mut draft = structured::extract(&doc, url, cdn);
        let mut tier = "structured";

        if draft.is_empty() {
            draft = scripts::extract(&doc, url, cdn);
            tier = "scripts";
        }

        if self.insufficient(&draft) {
            tracing::debug!(
                brand = self.profile.id,
                after = tier,
                images = draft.images.len(),
                sizes = draft.sizes.len(),
                "augmenting with selector harvest"
            );
            draft.absorb(selectors::extract(&doc, url, self.profile));
        }

        draft.brand = Some(self.profile.name.to_string());
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use prodex_core::Error;

    fn zara() -> BrandExtractor {
        BrandExtractor::new(&BrandProfile::ZARA, AugmentConfig::default())
    }

    fn url() -> Url {
        Url::parse("https://www.zara.com/us/en/linen-shirt-p01234567.html").unwrap()
    }

    fn ld_json(images: &str) -> String {
        format!(
            r#"<script type="application/ld+json">{{"@type":"Product","name":"Linen Shirt","image":{images},
                "offers":{{"price":"39.90"}},"description":"Relaxed fit."}}</script>"#
        )
    }

    #[test]
    fn test_can_handle() {
        let zara = zara();
        assert!(zara.can_handle(&url()));
        assert!(zara.can_handle(&Url::parse("https://zara.com/es/").unwrap()));
        assert!(!zara.can_handle(&Url::parse("https://generic-shop.example/item/1").unwrap()));
        assert_eq!(zara.id(), StrategyId::Brand("zara"));
    }

    #[test]
    fn test_structured_with_few_images_is_augmented_in_order() {
        let html = format!(
            r#"<html><head>{}</head><body>
                <h1>Ignored Heading</h1>
                <img src="https://static.zara.net/photos/1.jpg?ts=5">
                <img src="https://static.zara.net/photos/2.jpg">
                <img src="https://static.zara.net/photos/3.jpg">
                <img src="https://static.zara.net/photos/4.jpg">
                <img src="https://static.zara.net/photos/5.jpg">
                <li class="size-item">S</li><li class="size-item">M</li>
            </body></html>"#,
            ld_json(r#""https://static.zara.net/photos/1.jpg""#)
        );

        let record = zara().extract(&url(), &html, Utc::now()).unwrap();

        assert_eq!(record.title.as_deref(), Some("Linen Shirt"));
        assert_eq!(record.price.as_deref(), Some("39.90"));
        assert_eq!(record.brand.as_deref(), Some("Zara"));
        assert_eq!(record.images.len(), 5);
        assert_eq!(record.images[0], "https://static.zara.net/photos/1.jpg");
        assert_eq!(record.images[4], "https://static.zara.net/photos/5.jpg");
        assert_eq!(record.sizes, vec!["S", "M"]);
    }

    #[test]
    fn test_sufficient_structured_skips_selectors() {
        let images = r#"["https://static.zara.net/p/1.jpg","https://static.zara.net/p/2.jpg","https://static.zara.net/p/3.jpg"]"#;
        let augment = AugmentConfig { require_sizes: false, ..Default::default() };
        let extractor = BrandExtractor::new(&BrandProfile::ZARA, augment);
        let html = format!(
            r#"<html><head>{}</head><body><img src="https://static.zara.net/p/9.jpg"></body></html>"#,
            ld_json(images)
        );

        let draft = extractor.harvest(&url(), &html);
        assert_eq!(draft.images.len(), 3);
        assert!(!draft.images.iter().any(|i| i.ends_with("9.jpg")));
    }

    #[test]
    fn test_scripts_used_when_structured_empty() {
        let html = r#"<html><body>
            <script>window.__state = {"product":{"name":"Pleated Skirt","images":["https://static.zara.net/p/s1.jpg"]}};</script>
            <h1 class="product-name">Pleated Skirt (DOM)</h1>
            <span class="price">$45.90</span>
        </body></html>"#;

        let draft = zara().harvest(&url(), html);

        assert_eq!(draft.title.as_deref(), Some("Pleated Skirt"));
        assert_eq!(draft.price.as_deref(), Some("$45.90"));
        assert_eq!(draft.images[0], "https://static.zara.net/p/s1.jpg");
    }

    #[test]
    fn test_selectors_alone() {
        let html = r#"<html><head><meta property="og:image" content="https://static.zara.net/p/og.jpg"></head><body>
            <h1 data-testid="product-name">Denim Jacket</h1>
        </body></html>"#;

        let draft = zara().harvest(&url(), html);
        assert_eq!(draft.title.as_deref(), Some("Denim Jacket"));
        assert_eq!(draft.images, vec!["https://static.zara.net/p/og.jpg"]);
    }

    #[test]
    fn test_no_data_found_names_brand() {
        let err = zara().extract(&url(), "<html><body><p>Access denied</p></body></html>", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::NoDataFound { ref strategy, .. } if strategy == "zara"));
    }
}
