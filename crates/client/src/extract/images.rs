//! Image URL canonicalization and acceptance.

use url::Url;

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// Substrings that mark spacer or placeholder images.
const PLACEHOLDER_MARKERS: &[&str] = &["transparent", "placeholder"];

/// Canonicalize `candidate` found on `page`, or reject it.
///
/// The candidate is resolved against the page, stripped of its query and
/// fragment, and kept only if it is http(s), carries no placeholder marker,
/// and either ends in an image extension or lives on a host containing one
/// of `trusted_hosts`.
pub fn normalize(candidate: &str, page: &Url, trusted_hosts: &[&str]) -> Option<String> {
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return None;
    }

    let mut url = page.join(candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);

    let canonical = url.to_string();
    let lowered = canonical.to_ascii_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        return None;
    }

    let path = url.path().to_ascii_lowercase();
    let has_extension = IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    let trusted = url
        .host_str()
        .map(str::to_ascii_lowercase)
        .is_some_and(|host| trusted_hosts.iter().any(|t| host.contains(&t.to_ascii_lowercase())));

    (has_extension || trusted).then_some(canonical)
}

/// URLs inside a `srcset` value, descriptors dropped.
pub fn srcset_urls(srcset: &str) -> impl Iterator<Item = &str> {
    srcset.split(',').filter_map(|part| part.split_whitespace().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        Url::parse("https://www.zara.com/us/en/shirt-p1.html").unwrap()
    }

    const CDN: &[&str] = &["static.zara.net"];

    #[test]
    fn test_relative_resolution_and_query_strip() {
        let got = normalize("/assets/img/shirt.jpg?w=750&ts=1#zoom", &page(), &[]);
        assert_eq!(got.as_deref(), Some("https://www.zara.com/assets/img/shirt.jpg"));
    }

    #[test]
    fn test_protocol_relative() {
        let got = normalize("//static.zara.net/photos/2024/p1/1.jpg?ts=9", &page(), CDN);
        assert_eq!(got.as_deref(), Some("https://static.zara.net/photos/2024/p1/1.jpg"));
    }

    #[test]
    fn test_trusted_host_without_extension() {
        let got = normalize("https://static.zara.net/assets/public/abcd/w/750/", &page(), CDN);
        assert_eq!(got.as_deref(), Some("https://static.zara.net/assets/public/abcd/w/750/"));
        assert!(normalize("https://other.example/assets/abcd", &page(), CDN).is_none());
    }

    #[test]
    fn test_rejects_placeholders() {
        assert!(normalize("https://static.zara.net/stdstatic/transparent-background.png", &page(), CDN).is_none());
        assert!(normalize("/img/placeholder.jpg", &page(), CDN).is_none());
    }

    #[test]
    fn test_rejects_non_http_and_blank() {
        assert!(normalize("data:image/gif;base64,R0lGODlhAQABAAAAACw=", &page(), CDN).is_none());
        assert!(normalize("   ", &page(), CDN).is_none());
        assert!(normalize("javascript:void(0)", &page(), CDN).is_none());
    }

    #[test]
    fn test_extension_checked_case_insensitively() {
        let got = normalize("https://cdn.example/p/FRONT.JPG", &page(), &[]);
        assert_eq!(got.as_deref(), Some("https://cdn.example/p/FRONT.JPG"));
        assert!(normalize("https://cdn.example/p/front.gif", &page(), &[]).is_none());
    }

    #[test]
    fn test_same_image_different_query_normalizes_equal() {
        let a = normalize("https://cdn.example/a.jpg?w=100", &page(), &[]);
        let b = normalize("https://cdn.example/a.jpg?w=1920", &page(), &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_srcset_urls() {
        let urls: Vec<&str> =
            srcset_urls("https://cdn.example/a.jpg 1x, https://cdn.example/a@2x.jpg 2x,,  /b.webp 750w").collect();
        assert_eq!(urls, vec!["https://cdn.example/a.jpg", "https://cdn.example/a@2x.jpg", "/b.webp"]);
    }
}
