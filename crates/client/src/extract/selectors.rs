//! Selector-harvesting tier and its attribute-scan fallback.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::brand::BrandProfile;
use super::fields::{ProductDraft, element_text, first_non_empty, select_text};
use super::images;

const TIER: &str = "selectors";

/// Below this many images the attribute scan runs.
pub const SCAN_TRIGGER: usize = 3;
/// The attribute scan stops once the tier holds this many images.
pub const SCAN_LIMIT: usize = 6;

/// Attributes read by the attribute scan, highest priority first. `srcset` parts come before `src`.
const SCAN_ATTRIBUTES: &[&str] = &["data-zoom-image", "data-main-image", "data-hires", "data-src"];

/// Attributes holding a container image's source, in fallback order.
const SOURCE_ATTRIBUTES: &[&str] = &["src", "data-src", "data-lazy-src"];

static SIZE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:XS|S|M|L|XL|XXL|\d+)$").expect("size token pattern"));

static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("og:image selector"));

static PICTURE_SOURCE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("picture source[srcset]").expect("picture source selector"));

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("img selector"));

/// Whether `text` is a bare size token (`XS`..`XXL` or digits).
pub fn is_size_token(text: &str) -> bool {
    text.len() <= 5 && SIZE_TOKEN.is_match(text)
}

fn parse(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::debug!(selector = css, error = %e, "skipping unparsable selector");
            None
        }
    }
}

fn has_keyword(candidate: &str, keywords: &[&str]) -> bool {
    let lowered = candidate.to_ascii_lowercase();
    keywords.iter().any(|k| lowered.contains(k))
}

struct Harvest<'a> {
    page: &'a Url,
    profile: &'a BrandProfile,
    draft: ProductDraft,
}

impl Harvest<'_> {
    fn add(&mut self, candidate: &str) {
        if let Some(canonical) = images::normalize(candidate, self.page, self.profile.cdn_hosts) {
            self.draft.push_image(canonical);
        }
    }

    fn add_if_keyword(&mut self, candidate: &str) {
        if has_keyword(candidate, self.profile.image_keywords) {
            self.add(candidate);
        }
    }

    fn og_image(&mut self, doc: &Html) {
        let content = doc.select(&OG_IMAGE).find_map(|meta| meta.value().attr("content"));
        if let Some(content) = content {
            self.add(content);
        }
    }

    fn containers(&mut self, doc: &Html) {
        let containers = self.profile.image_containers;
        for selector in containers.iter().filter_map(|css| parse(css)) {
            for img in doc.select(&selector) {
                let source =
                    SOURCE_ATTRIBUTES.iter().find_map(|attr| img.value().attr(attr).filter(|v| !v.trim().is_empty()));
                if let Some(source) = source {
                    self.add_if_keyword(source);
                }
            }
        }
    }

    fn picture_sources(&mut self, doc: &Html) {
        for source in doc.select(&PICTURE_SOURCE) {
            let Some(srcset) = source.value().attr("srcset") else {
                continue;
            };
            for candidate in images::srcset_urls(srcset) {
                self.add_if_keyword(candidate);
            }
        }
    }

    fn cdn_images(&mut self, doc: &Html) {
        let hosts = self.profile.cdn_hosts;
        for host in hosts {
            let Some(selector) = parse(&format!(r#"img[src*="{host}"]"#)) else {
                continue;
            };
            for img in doc.select(&selector) {
                if let Some(src) = img.value().attr("src") {
                    self.add(src);
                }
            }
        }
    }

    fn attribute_scan(&mut self, doc: &Html) {
        tracing::debug!(tier = TIER, images = self.draft.images.len(), "running attribute scan");
        for img in doc.select(&IMG) {
            for candidate in scan_candidates(img) {
                if self.draft.images.len() >= SCAN_LIMIT {
                    return;
                }
                self.add(candidate);
            }
        }
    }
}

/// Candidate sources on one `<img>`, in scan priority order.
fn scan_candidates(img: ElementRef<'_>) -> Vec<&str> {
    let element = img.value();
    let mut candidates: Vec<&str> = SCAN_ATTRIBUTES.iter().filter_map(|attr| element.attr(attr)).collect();
    if let Some(srcset) = element.attr("srcset") {
        candidates.extend(images::srcset_urls(srcset));
    }
    candidates.extend(element.attr("src"));
    candidates
}

/// Labels under the first selector in `selectors` that yields any accepted label.
fn first_label_group(doc: &Html, selectors: &[&str], accept: impl Fn(&mut ProductDraft, &str) -> bool) -> ProductDraft {
    for selector in selectors.iter().filter_map(|css| parse(css)) {
        let mut group = ProductDraft::default();
        for element in doc.select(&selector) {
            accept(&mut group, &element_text(element));
        }
        if !group.sizes.is_empty() || !group.colors.is_empty() {
            return group;
        }
    }
    ProductDraft::default()
}

/// Run the selector-harvesting tier with `profile`'s selector lists.
pub fn extract(doc: &Html, page: &Url, profile: &BrandProfile) -> ProductDraft {
    let mut harvest = Harvest { page, profile, draft: ProductDraft::default() };

    harvest.draft.title = first_non_empty(profile.title_selectors.iter().map(|css| select_text(doc, css)));
    harvest.draft.price = first_non_empty(profile.price_selectors.iter().map(|css| select_text(doc, css)));
    harvest.draft.description = first_non_empty(profile.description_selectors.iter().map(|css| select_text(doc, css)));

    harvest.og_image(doc);
    harvest.containers(doc);
    harvest.picture_sources(doc);
    harvest.cdn_images(doc);
    if harvest.draft.images.len() < SCAN_TRIGGER {
        harvest.attribute_scan(doc);
    }

    let mut draft = harvest.draft;
    draft.sizes =
        first_label_group(doc, profile.size_selectors, |d, text| is_size_token(text) && d.push_size(text)).sizes;
    draft.colors = first_label_group(doc, profile.color_selectors, |d, text| d.push_color(text)).colors;

    tracing::debug!(
        tier = TIER,
        images = draft.images.len(),
        sizes = draft.sizes.len(),
        colors = draft.colors.len(),
        title = draft.title.is_some(),
        "tier complete"
    );
    draft
}
