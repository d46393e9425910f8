//! Rule-based validation and confidence scoring for extracted entities.
//!
//! Every entity starts from a base score and collects additive or
//! subtractive adjustments, each paired with a human-readable concern.
//! Scores are clamped to [0,1]; validation never rejects an entity, it
//! only scores and flags it.

pub mod fuzzy;

use tracing::{debug, instrument};

use brandscan_shared::{
    AssetExtraction, BrandContext, BusinessType, ExtractionResult, FeatureExtraction,
    PricingExtraction, PricingModel, ProductExtraction, ValidatedAsset, ValidatedExtraction,
    ValidatedFeature, ValidatedPricing, ValidatedProduct, is_junk_image_url,
};

pub use fuzzy::{MATCH_THRESHOLD, fuzzy_match, matches_any};

/// Starting score before adjustments.
const BASE_SCORE: f64 = 0.8;
/// Floor score for assets whose URL matches a junk pattern.
const JUNK_ASSET_SCORE: f64 = 0.2;
/// Products below this score need human review.
const REVIEW_SCORE_THRESHOLD: f64 = 0.6;
/// Products with more concerns than this need human review.
const REVIEW_CONCERN_LIMIT: usize = 2;

/// Name fragments that are navigation chrome, not product names.
const NAVIGATION_NAMES: &[&str] = &[
    "shop",
    "home",
    "menu",
    "products",
    "about",
    "contact",
    "learn more",
    "read more",
    "see all",
    "view all",
    "click here",
    "sign up",
    "log in",
    "login",
    "buy now",
    "get started",
];

/// Score a merged extraction against the researched brand context.
#[instrument(skip_all, fields(products = extraction.products.len()))]
pub fn validate(extraction: &ExtractionResult, context: &BrandContext) -> ValidatedExtraction {
    let mut products: Vec<ValidatedProduct> = extraction
        .products
        .iter()
        .map(|p| validate_product(p, context))
        .collect();
    flag_duplicate_products(&mut products);

    let pricing = extraction
        .pricing
        .as_ref()
        .map(|p| validate_pricing(p, context));

    let features = extraction
        .features
        .iter()
        .map(|f| validate_feature(f, context))
        .collect();

    let assets = extraction
        .assets
        .iter()
        .map(|a| validate_asset(a, &products))
        .collect();

    let confidence = overall_confidence(&products, &pricing, extraction.confidence);

    debug!(confidence, "validation complete");

    ValidatedExtraction {
        products,
        pricing,
        features,
        assets,
        confidence,
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

fn validate_product(product: &ProductExtraction, context: &BrandContext) -> ValidatedProduct {
    let mut score = BASE_SCORE;
    let mut concerns = Vec::new();
    let mut cross_check_sources = Vec::new();

    if let Some(known) = matches_any(&product.name, &context.known_products) {
        score += 0.1;
        cross_check_sources.push(format!("known product '{known}'"));
    }

    if type_mismatch(product.product_type.as_deref(), context.business_type) {
        score -= 0.1;
        concerns.push(format!(
            "product type '{}' is inconsistent with a {} business",
            product.product_type.as_deref().unwrap_or("unknown"),
            context.business_type,
        ));
    }

    if let Some(concern) = price_sanity_concern(product, context.business_type) {
        score -= 0.15;
        concerns.push(concern);
    }

    for issue in name_quality_issues(&product.name) {
        score -= 0.2;
        concerns.push(issue);
    }

    if product.images.is_empty() {
        score -= 0.05;
        concerns.push("no product images".to_string());
    } else if product.images.iter().any(|url| is_junk_image_url(url)) {
        score -= 0.05;
        concerns.push("contains junk image URLs".to_string());
    }

    if product
        .description
        .as_deref()
        .is_none_or(|d| d.trim().len() < 10)
    {
        score -= 0.05;
        concerns.push("missing or very short description".to_string());
    }

    let validation_score = score.clamp(0.0, 1.0);
    let needs_review =
        validation_score < REVIEW_SCORE_THRESHOLD || concerns.len() > REVIEW_CONCERN_LIMIT;

    ValidatedProduct {
        product: product.clone(),
        validation_score,
        validation_concerns: concerns,
        needs_review,
        cross_check_sources,
    }
}

/// A physical product under a pure-SaaS business (and vice versa) is a
/// signal the extraction picked up something else.
fn type_mismatch(product_type: Option<&str>, business_type: BusinessType) -> bool {
    let Some(product_type) = product_type else {
        return false;
    };
    let product_type = product_type.to_lowercase();
    match business_type {
        BusinessType::Saas => matches!(product_type.as_str(), "physical" | "hardware"),
        BusinessType::Ecommerce => matches!(product_type.as_str(), "saas" | "software"),
        _ => false,
    }
}

fn price_sanity_concern(product: &ProductExtraction, business_type: BusinessType) -> Option<String> {
    let price = product.price?;
    if price < 0.0 {
        return Some(format!("negative price {price}"));
    }
    match business_type {
        BusinessType::Saas if price > 50_000.0 => {
            Some(format!("price {price} is implausibly high for a subscription"))
        }
        BusinessType::Ecommerce if price > 1_000_000.0 => {
            Some(format!("price {price} is implausibly high for a physical product"))
        }
        BusinessType::Ecommerce if price < 0.01 => {
            Some(format!("price {price} is implausibly low for a physical product"))
        }
        _ => None,
    }
}

fn name_quality_issues(name: &str) -> Vec<String> {
    let trimmed = name.trim();
    let mut issues = Vec::new();

    if trimmed.chars().count() > 80 {
        issues.push("name is suspiciously long".to_string());
    }
    if trimmed.ends_with("...") || trimmed.ends_with('…') {
        issues.push("name looks truncated".to_string());
    }
    if NAVIGATION_NAMES.contains(&trimmed.to_lowercase().as_str()) {
        issues.push(format!("name '{trimmed}' looks like navigation text"));
    }
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        issues.push("name is purely numeric".to_string());
    }
    if trimmed.chars().count() < 3 {
        issues.push("name is too short".to_string());
    }

    issues
}

/// Duplicate names across the whole batch penalize every copy and force
/// review on all of them.
fn flag_duplicate_products(products: &mut [ValidatedProduct]) {
    use std::collections::HashMap;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for p in products.iter() {
        *counts
            .entry(p.product.name.trim().to_lowercase())
            .or_default() += 1;
    }

    for p in products.iter_mut() {
        if counts[&p.product.name.trim().to_lowercase()] > 1 {
            p.validation_score = (p.validation_score - 0.1).clamp(0.0, 1.0);
            p.validation_concerns
                .push("duplicate product name in result set".to_string());
            p.needs_review = true;
        }
    }
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

fn validate_pricing(pricing: &PricingExtraction, context: &BrandContext) -> ValidatedPricing {
    let mut score = BASE_SCORE;
    let mut concerns = Vec::new();

    match pricing.tiers.len() {
        0 => {
            score -= 0.3;
            concerns.push("no pricing tiers extracted".to_string());
        }
        1 => {
            score -= 0.1;
            concerns.push("only one pricing tier".to_string());
        }
        _ => {}
    }

    let priced: Vec<f64> = pricing.tiers.iter().filter_map(|t| t.price).collect();
    if priced.windows(2).any(|w| w[1] < w[0]) {
        score -= 0.1;
        concerns.push("tier prices are not in ascending order".to_string());
    }

    let mut seen = std::collections::HashSet::new();
    if pricing
        .tiers
        .iter()
        .any(|t| !seen.insert(t.name.trim().to_lowercase()))
    {
        score -= 0.15;
        concerns.push("duplicate tier names".to_string());
    }

    let extracted_model = PricingModel::from_label(&pricing.model);
    if extracted_model != PricingModel::Unknown
        && context.pricing_model != PricingModel::Unknown
        && extracted_model != context.pricing_model
    {
        score -= 0.1;
        concerns.push(format!(
            "extracted model '{extracted_model}' disagrees with researched model '{}'",
            context.pricing_model,
        ));
    }

    if !pricing.tiers.is_empty() && pricing.tiers.iter().all(|t| t.features.is_empty()) {
        score -= 0.1;
        concerns.push("no tier lists any features".to_string());
    }

    ValidatedPricing {
        pricing: pricing.clone(),
        validation_score: score.clamp(0.0, 1.0),
        validation_concerns: concerns,
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

fn validate_feature(feature: &FeatureExtraction, context: &BrandContext) -> ValidatedFeature {
    let mut score = BASE_SCORE;
    let mut concerns = Vec::new();

    if feature.name.trim().chars().count() < 3 {
        score -= 0.3;
        concerns.push("feature name missing or too short".to_string());
    }
    if feature.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
        score -= 0.1;
        concerns.push("feature has no description".to_string());
    }

    let references_product = matches_any(&feature.name, &context.known_products).is_some()
        || feature.description.as_deref().is_some_and(|d| {
            context
                .known_products
                .iter()
                .any(|p| d.to_lowercase().contains(&p.to_lowercase()))
        });
    if references_product {
        score += 0.1;
    }

    ValidatedFeature {
        feature: feature.clone(),
        validation_score: score.clamp(0.0, 1.0),
        validation_concerns: concerns,
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

fn validate_asset(asset: &AssetExtraction, products: &[ValidatedProduct]) -> ValidatedAsset {
    let mut concerns = Vec::new();

    let mut score = if is_junk_image_url(&asset.url) {
        concerns.push("URL matches a junk-asset pattern".to_string());
        JUNK_ASSET_SCORE
    } else {
        BASE_SCORE
    };

    let alt = asset.alt_text.as_deref().unwrap_or("");
    let matches_product = products.iter().any(|p| {
        fuzzy_match(alt, &p.product.name) >= MATCH_THRESHOLD
            || asset
                .url
                .to_lowercase()
                .contains(&normalize_fragment(&p.product.name))
    });
    if matches_product {
        score += 0.1;
    }
    if alt.trim().chars().count() > 5 {
        score += 0.05;
    }

    ValidatedAsset {
        asset: asset.clone(),
        validation_score: score.clamp(0.0, 1.0),
        validation_concerns: concerns,
    }
}

fn normalize_fragment(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

// ---------------------------------------------------------------------------
// Overall confidence
// ---------------------------------------------------------------------------

/// Mean of all non-zero product and pricing scores, falling back to the
/// raw extraction confidence when nothing scored.
fn overall_confidence(
    products: &[ValidatedProduct],
    pricing: &Option<ValidatedPricing>,
    extraction_confidence: f64,
) -> f64 {
    let mut scores: Vec<f64> = products
        .iter()
        .map(|p| p.validation_score)
        .filter(|s| *s > 0.0)
        .collect();
    if let Some(p) = pricing {
        if p.validation_score > 0.0 {
            scores.push(p.validation_score);
        }
    }

    if scores.is_empty() {
        extraction_confidence.clamp(0.0, 1.0)
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
