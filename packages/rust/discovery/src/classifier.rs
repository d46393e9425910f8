//! URL-to-page-type classification.
//!
//! An ordered table of (path pattern, page type, priority) entries is
//! evaluated first-match-wins against the URL's path. The table order is
//! the tie-break, so classification is pure and deterministic. Lower
//! priority means more important.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use brandscan_shared::PageType;

/// Priority assigned to URLs that match nothing in the table.
pub const LOWEST_PRIORITY: u32 = 99;

struct PatternEntry {
    pattern: Regex,
    page_type: PageType,
    priority: u32,
}

/// The classification table. Order matters: earlier entries win ties.
static PATTERN_TABLE: LazyLock<Vec<PatternEntry>> = LazyLock::new(|| {
    let entries: &[(&str, PageType, u32)] = &[
        (r"^/pricing", PageType::Pricing, 1),
        (r"^/plans", PageType::Pricing, 1),
        (r"^/products?(/|$)", PageType::Products, 2),
        (r"^/shop(/|$)", PageType::Products, 2),
        (r"^/store(/|$)", PageType::Products, 2),
        (r"^/collections?(/|$)", PageType::Products, 2),
        (r"^/catalog", PageType::Products, 2),
        (r"^/item/", PageType::Product, 3),
        (r"^/p/", PageType::Product, 3),
        (r"^/features", PageType::Features, 2),
        (r"^/platform", PageType::Features, 2),
        (r"^/solutions", PageType::Features, 3),
        (r"^/capabilities", PageType::Features, 3),
        (r"^/services", PageType::Features, 3),
        (r"^/about", PageType::About, 4),
        (r"^/company", PageType::About, 4),
        (r"^/team", PageType::About, 5),
        (r"^/docs", PageType::Docs, 6),
        (r"^/documentation", PageType::Docs, 6),
        (r"^/developers?(/|$)", PageType::Docs, 6),
        (r"^/blog", PageType::Blog, 7),
        (r"^/news", PageType::Blog, 7),
        (r"^/press", PageType::Blog, 7),
        (r"^/contact", PageType::Contact, 8),
        (r"^/support", PageType::Contact, 8),
        (r"^/careers", PageType::Careers, 9),
        (r"^/jobs", PageType::Careers, 9),
        (r"^/(privacy|terms|legal|cookies)", PageType::Legal, 10),
    ];
    entries
        .iter()
        .map(|(pattern, page_type, priority)| PatternEntry {
            pattern: Regex::new(pattern).expect("static pattern must compile"),
            page_type: *page_type,
            priority: *priority,
        })
        .collect()
});

/// Classify a URL into a (page type, priority) pair.
///
/// Accepts absolute URLs or bare paths. The root path maps to
/// `homepage` with priority 0; unmatched paths map to `other` with
/// [`LOWEST_PRIORITY`].
pub fn classify(url: &str) -> (PageType, u32) {
    let path = path_of(url);
    let path = path.trim_end_matches('/');

    if path.is_empty() {
        return (PageType::Homepage, 0);
    }

    for entry in PATTERN_TABLE.iter() {
        if entry.pattern.is_match(path) {
            return (entry.page_type, entry.priority);
        }
    }

    (PageType::Other, LOWEST_PRIORITY)
}

/// Extract the path component, lowercased. Relative inputs are treated
/// as paths directly.
fn path_of(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => {
            let bare = url.split(['?', '#']).next().unwrap_or(url);
            if bare.starts_with('/') {
                bare.to_lowercase()
            } else {
                format!("/{}", bare.to_lowercase())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_homepage() {
        assert_eq!(classify("https://acme.com/"), (PageType::Homepage, 0));
        assert_eq!(classify("https://acme.com"), (PageType::Homepage, 0));
        assert_eq!(classify("/"), (PageType::Homepage, 0));
    }

    #[test]
    fn pricing_outranks_everything() {
        let (page_type, priority) = classify("https://acme.com/pricing");
        assert_eq!(page_type, PageType::Pricing);
        assert_eq!(priority, 1);
        assert_eq!(classify("/plans/compare").0, PageType::Pricing);
    }

    #[test]
    fn product_paths_classify() {
        assert_eq!(classify("/products").0, PageType::Products);
        assert_eq!(classify("/product/widget").0, PageType::Products);
        assert_eq!(classify("/shop/").0, PageType::Products);
        assert_eq!(classify("/collections/summer").0, PageType::Products);
        assert_eq!(classify("/p/widget-123").0, PageType::Product);
    }

    #[test]
    fn first_match_wins_on_order() {
        // "/pricing-plans" matches the "^/pricing" entry before "^/plans"
        // could ever be consulted.
        assert_eq!(classify("/pricing-plans"), (PageType::Pricing, 1));
    }

    #[test]
    fn unmatched_path_is_other_with_lowest_priority() {
        assert_eq!(classify("/xyzzy"), (PageType::Other, LOWEST_PRIORITY));
    }

    #[test]
    fn classification_is_deterministic() {
        let url = "https://acme.com/features/analytics";
        let first = classify(url);
        for _ in 0..100 {
            assert_eq!(classify(url), first);
        }
        assert_eq!(first, (PageType::Features, 2));
    }

    #[test]
    fn case_insensitive_paths() {
        assert_eq!(classify("https://acme.com/Pricing").0, PageType::Pricing);
        assert_eq!(classify("/ABOUT").0, PageType::About);
    }

    #[test]
    fn trailing_slash_ignored() {
        assert_eq!(classify("/about/"), classify("/about"));
    }
}
