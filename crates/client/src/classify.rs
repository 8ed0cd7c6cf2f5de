//! Rule-based garment categorization from a product title.

use serde::Serialize;

/// Where a garment is worn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentCategory {
    Upper,
    Lower,
}

/// Result of [`categorize_garment`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GarmentClass {
    pub category: GarmentCategory,
    /// Garment kind, e.g. `shirt`, `jacket`, `pants`.
    pub kind: &'static str,
    pub confidence: f32,
}

const MATCHED_CONFIDENCE: f32 = 0.8;
const DEFAULT_CONFIDENCE: f32 = 0.3;

/// Kinds checked in order; the first kind with a keyword in the title wins.
const RULES: &[(GarmentCategory, &str, &[&str])] = &[
    (GarmentCategory::Upper, "shirt", &["shirt", "blouse", "top", "tee", "t-shirt", "tank", "cami"]),
    (GarmentCategory::Upper, "jacket", &["jacket", "coat", "blazer", "cardigan", "hoodie", "sweater"]),
    (GarmentCategory::Upper, "dress", &["dress", "gown", "frock"]),
    (GarmentCategory::Upper, "top", &["top", "blouse", "shirt"]),
    (GarmentCategory::Lower, "pants", &["pants", "trousers", "jeans", "slacks"]),
    (GarmentCategory::Lower, "shorts", &["shorts", "bermuda"]),
    (GarmentCategory::Lower, "skirt", &["skirt"]),
    (GarmentCategory::Lower, "leggings", &["leggings", "tights"]),
];

/// Classify a garment by keywords in its title.
///
/// Unmatched or missing titles default to an upper-body top with low confidence.
pub fn categorize_garment(title: Option<&str>) -> GarmentClass {
    let lowered = title.unwrap_or_default().to_lowercase();

    RULES
        .iter()
        .find(|(_, _, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|&(category, kind, _)| GarmentClass { category, kind, confidence: MATCHED_CONFIDENCE })
        .unwrap_or(GarmentClass { category: GarmentCategory::Upper, kind: "top", confidence: DEFAULT_CONFIDENCE })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upper_garments() {
        let shirt = categorize_garment(Some("Relaxed Fit Linen SHIRT"));
        assert_eq!((shirt.category, shirt.kind), (GarmentCategory::Upper, "shirt"));
        assert_eq!(shirt.confidence, MATCHED_CONFIDENCE);

        assert_eq!(categorize_garment(Some("Wool Blend Coat")).kind, "jacket");
        assert_eq!(categorize_garment(Some("Satin Midi Dress")).kind, "dress");
    }

    #[test]
    fn test_lower_garments() {
        let jeans = categorize_garment(Some("Straight Leg Jeans"));
        assert_eq!((jeans.category, jeans.kind), (GarmentCategory::Lower, "pants"));
        assert_eq!(categorize_garment(Some("Bermuda shorts")).kind, "shorts");
        assert_eq!(categorize_garment(Some("Pleated Skirt")).kind, "skirt");
        assert_eq!(categorize_garment(Some("Ribbed Leggings")).kind, "leggings");
    }

    #[test]
    fn test_earlier_rule_wins() {
        // shirt rules precede dress rules
        assert_eq!(categorize_garment(Some("Shirt Dress")).kind, "shirt");
    }

    #[test]
    fn test_default() {
        for title in [None, Some(""), Some("Leather Belt")] {
            let class = categorize_garment(title);
            assert_eq!((class.category, class.kind), (GarmentCategory::Upper, "top"));
            assert_eq!(class.confidence, DEFAULT_CONFIDENCE);
        }
    }

    #[test]
    fn test_serializes_lowercase_category() {
        let json = serde_json::to_value(categorize_garment(Some("Cargo Trousers"))).unwrap();
        assert_eq!(json["category"], "lower");
        assert_eq!(json["kind"], "pants");
    }
}
