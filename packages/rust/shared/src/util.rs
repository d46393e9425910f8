//! Small helpers shared across pipeline phases.

/// URL substrings that mark an image as non-content: tracking pixels,
/// social icons, payment badges, placeholders. Matched case-insensitively
/// against the full URL.
const JUNK_IMAGE_PATTERNS: &[&str] = &[
    "pixel",
    "tracking",
    "1x1",
    "spacer",
    "blank.",
    "placeholder",
    "badge",
    "sprite",
    "icon-",
    "favicon",
    "avatar",
    "gravatar",
    "facebook",
    "twitter",
    "instagram",
    "linkedin",
    "youtube",
    "tiktok",
    "visa",
    "mastercard",
    "amex",
    "paypal",
    "klarna",
    "doubleclick",
    "analytics",
];

/// Whether an image URL matches a known non-content pattern.
pub fn is_junk_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    JUNK_IMAGE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Normalize a user-supplied domain: strip scheme, `www.`, path, and port.
pub fn normalize_domain(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(&trimmed);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    let host = host.split(':').next().unwrap_or(host);
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Truncate content to at most `max_chars` characters, with a marker so
/// the model knows the page was cut.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((end, _)) => format!(
            "{}\n\n[... content truncated for LLM context window ...]",
            &content[..end]
        ),
    }
}
