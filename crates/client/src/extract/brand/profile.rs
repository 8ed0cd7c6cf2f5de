//! Static per-retailer extraction profiles.

/// Everything a brand cascade needs to know about one retailer.
///
/// Selector lists are ordered; for scalar fields the first selector that
/// yields non-empty text wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrandProfile {
    /// Stable identifier, reported as the strategy id.
    pub id: &'static str,
    /// Brand name stamped on every record.
    pub name: &'static str,
    /// Host suffixes this profile handles.
    pub domains: &'static [&'static str],
    /// Host substrings whose URLs are images even without an extension.
    pub cdn_hosts: &'static [&'static str],
    /// Substrings a container or srcset image URL must contain.
    pub image_keywords: &'static [&'static str],
    pub title_selectors: &'static [&'static str],
    pub price_selectors: &'static [&'static str],
    pub description_selectors: &'static [&'static str],
    /// Image elements inside product galleries.
    pub image_containers: &'static [&'static str],
    pub size_selectors: &'static [&'static str],
    pub color_selectors: &'static [&'static str],
}

impl BrandProfile {
    pub const ZARA: BrandProfile = BrandProfile {
        id: "zara",
        name: "Zara",
        domains: &["zara.com"],
        cdn_hosts: &["static.zara.net"],
        image_keywords: &["product", "item", "garment", "zara", "static.zara.net"],
        title_selectors: &[
            "h1.product-detail-info__header-name",
            r#"h1[data-testid="product-name"]"#,
            "h1.product-name",
            r#"h1[itemprop="name"]"#,
            "h1",
        ],
        price_selectors: &[".price", ".money", r#"[data-testid="price"]"#, r#"[itemprop="price"]"#],
        description_selectors: &[
            ".product-description",
            r#"[itemprop="description"]"#,
            ".product-detail-info__description",
        ],
        image_containers: &[".product-detail-images img", ".media img", ".gallery img", ".carousel img"],
        size_selectors: &[".size", ".option", r#"[class*="size"]"#],
        color_selectors: &[".color", ".swatch", r#"[class*="color"]"#],
    };
}
