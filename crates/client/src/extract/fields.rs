//! Per-field resolution and the in-progress product draft.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use prodex_core::ProductRecord;

pub const MAX_IMAGES: usize = 20;
pub const MAX_SIZES: usize = 10;
pub const MAX_COLORS: usize = 10;

/// Words that label a picker rather than name a color.
const COLOR_PLACEHOLDERS: &[&str] = &["select", "choose", "color"];

/// The first candidate holding non-blank text, trimmed.
///
/// Candidates are pulled lazily, so a mapped iterator defers each lookup
/// until the previous one came back empty.
pub fn first_non_empty<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|text| text.trim().to_string())
        .find(|text| !text.is_empty())
}

/// Element text with whitespace runs collapsed to single spaces.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of the first element matching `css` that has any.
///
/// Invalid selectors match nothing.
pub fn select_text(doc: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    first_non_empty(doc.select(&selector).map(|el| Some(element_text(el))))
}

/// Fields gathered by one or more tiers before they become a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub title: Option<String>,
    pub price: Option<String>,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
}

impl ProductDraft {
    /// A title or at least one image.
    pub fn has_data(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty()) || !self.images.is_empty()
    }

    /// No field carries anything.
    pub fn is_empty(&self) -> bool {
        !self.has_data()
            && self.price.is_none()
            && self.sizes.is_empty()
            && self.colors.is_empty()
            && self.description.is_none()
    }

    /// Append a canonical image URL unless already present or the list is full.
    pub fn push_image(&mut self, canonical: String) -> bool {
        if self.images.len() >= MAX_IMAGES || self.images.contains(&canonical) {
            return false;
        }
        self.images.push(canonical);
        true
    }

    /// Append a size token, deduplicated case-insensitively.
    pub fn push_size(&mut self, size: &str) -> bool {
        push_label(&mut self.sizes, size, MAX_SIZES)
    }

    /// Append a color label unless it is blank, too long or a picker placeholder.
    pub fn push_color(&mut self, color: &str) -> bool {
        let color = color.trim();
        if color.chars().count() >= 50 || COLOR_PLACEHOLDERS.contains(&color.to_lowercase().as_str()) {
            return false;
        }
        push_label(&mut self.colors, color, MAX_COLORS)
    }

    /// Merge a later tier's output into this one.
    ///
    /// Scalar and list fields already set here win; images are unioned with
    /// this draft's entries first.
    pub fn absorb(&mut self, later: ProductDraft) {
        fill(&mut self.title, later.title);
        fill(&mut self.price, later.price);
        fill(&mut self.brand, later.brand);
        fill(&mut self.description, later.description);
        if self.sizes.is_empty() {
            self.sizes = later.sizes;
        }
        if self.colors.is_empty() {
            self.colors = later.colors;
        }
        for image in later.images {
            self.push_image(image);
        }
    }

    /// Stamp the draft into a record for `url`.
    pub fn into_record(self, url: &str, scraped_at: DateTime<Utc>) -> ProductRecord {
        ProductRecord {
            title: self.title,
            price: self.price,
            images: self.images,
            sizes: self.sizes,
            colors: self.colors,
            brand: self.brand,
            description: self.description,
            ..ProductRecord::new(url, scraped_at)
        }
    }
}

fn fill(slot: &mut Option<String>, candidate: Option<String>) {
    if slot.as_deref().is_none_or(|s| s.trim().is_empty()) {
        *slot = candidate.filter(|c| !c.trim().is_empty());
    }
}

fn push_label(list: &mut Vec<String>, label: &str, cap: usize) -> bool {
    let label = label.trim();
    if label.is_empty() || list.len() >= cap || list.iter().any(|l| l.eq_ignore_ascii_case(label)) {
        return false;
    }
    list.push(label.to_string());
    true
}
