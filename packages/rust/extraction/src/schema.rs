//! Schema validation for raw completion output.
//!
//! The completion text is parsed into an untyped value first, then
//! validated field by field into an [`ExtractionResult`]. Model output is
//! never trusted as already-typed data: entries missing a required field
//! are dropped, numbers are coerced or nulled, and product image URLs are
//! screened against the junk-pattern list.

use serde_json::Value;
use tracing::debug;

use brandscan_shared::{
    AssetExtraction, BrandScanError, ExtractionResult, FeatureExtraction, PricingExtraction,
    PricingTier, ProductExtraction, Result, is_junk_image_url,
};

/// Parse and normalize a raw completion response for one page.
pub fn parse_extraction(raw: &str, source_url: &str) -> Result<ExtractionResult> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(cleaned)
        .map_err(|e| BrandScanError::parse(format!("completion output is not JSON: {e}")))?;

    let products = array_of(&value, "products", parse_product);
    let pricing = value.get("pricing").and_then(parse_pricing);
    let features = array_of(&value, "features", parse_feature);
    let assets = array_of(&value, "assets", parse_asset);

    let confidence = match opt_f64(value.get("confidence")) {
        Some(c) => clamp(c),
        None => fallback_confidence(&products, &pricing, &features, &assets),
    };

    debug!(
        products = products.len(),
        features = features.len(),
        assets = assets.len(),
        has_pricing = pricing.is_some(),
        confidence,
        "extraction response normalized"
    );

    Ok(ExtractionResult {
        products,
        pricing,
        features,
        assets,
        confidence,
        source_url: source_url.to_string(),
    })
}

fn parse_product(item: &Value) -> Option<ProductExtraction> {
    let name = required_string(item, "name")?;
    let images = string_array(item.get("images"))
        .into_iter()
        .filter(|url| !is_junk_image_url(url))
        .collect();

    Some(ProductExtraction {
        name,
        description: opt_string(item.get("description")),
        product_type: opt_string(item.get("product_type")),
        price: opt_f64(item.get("price")),
        currency: opt_string(item.get("currency")),
        images,
        url: opt_string(item.get("url")),
        confidence: clamp(opt_f64(item.get("confidence")).unwrap_or(0.5)),
    })
}

fn parse_pricing(value: &Value) -> Option<PricingExtraction> {
    let model = required_string(value, "model")?;
    let tiers = array_of(value, "tiers", parse_tier);

    Some(PricingExtraction {
        model,
        tiers,
        currency: opt_string(value.get("currency")),
        confidence: clamp(opt_f64(value.get("confidence")).unwrap_or(0.5)),
    })
}

fn parse_tier(item: &Value) -> Option<PricingTier> {
    let name = required_string(item, "name")?;
    Some(PricingTier {
        name,
        price: opt_f64(item.get("price")),
        period: opt_string(item.get("period")),
        features: string_array(item.get("features")),
    })
}

fn parse_feature(item: &Value) -> Option<FeatureExtraction> {
    let name = required_string(item, "name")?;
    Some(FeatureExtraction {
        name,
        description: opt_string(item.get("description")),
        category: opt_string(item.get("category")),
        confidence: clamp(opt_f64(item.get("confidence")).unwrap_or(0.5)),
    })
}

/// Junk asset URLs are kept here; the validator floor-scores them instead
/// of silently dropping them.
fn parse_asset(item: &Value) -> Option<AssetExtraction> {
    let url = required_string(item, "url")?;
    Some(AssetExtraction {
        url,
        asset_type: opt_string(item.get("asset_type")).unwrap_or_else(|| "image".to_string()),
        alt_text: opt_string(item.get("alt_text")),
        confidence: clamp(opt_f64(item.get("confidence")).unwrap_or(0.5)),
    })
}

// ---------------------------------------------------------------------------
// Untyped-value helpers
// ---------------------------------------------------------------------------

fn array_of<T>(value: &Value, key: &str, parse: impl Fn(&Value) -> Option<T>) -> Vec<T> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse).collect())
        .unwrap_or_default()
}

fn required_string(value: &Value, key: &str) -> Option<String> {
    let s = value.get(key)?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Numbers arrive as JSON numbers or as price-like strings ("$29", "1,200").
fn opt_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches(['$', '€', '£'])
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn clamp(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// When the model omits the overall confidence, average the per-item ones.
fn fallback_confidence(
    products: &[ProductExtraction],
    pricing: &Option<PricingExtraction>,
    features: &[FeatureExtraction],
    assets: &[AssetExtraction],
) -> f64 {
    let mut scores: Vec<f64> = Vec::new();
    scores.extend(products.iter().map(|p| p.confidence));
    scores.extend(pricing.iter().map(|p| p.confidence));
    scores.extend(features.iter().map(|f| f.confidence));
    scores.extend(assets.iter().map(|a| a.confidence));
    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Models sometimes wrap JSON in a markdown code fence despite instructions.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nameless_products_are_dropped() {
        let raw = r#"{"products": [{"name": "Anvil"}, {"description": "no name"}, {"name": "  "}], "confidence": 0.8}"#;
        let result = parse_extraction(raw, "https://acme.com/").unwrap();
        assert_eq!(result.products.len(), 1);
        assert_eq!(result.products[0].name, "Anvil");
    }

    #[test]
    fn string_prices_are_coerced() {
        let raw = r#"{"products": [{"name": "Anvil", "price": "$1,299.50"}], "confidence": 0.9}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.products[0].price, Some(1299.50));
    }

    #[test]
    fn non_numeric_price_becomes_null() {
        let raw = r#"{"products": [{"name": "Anvil", "price": "contact us"}], "confidence": 0.9}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.products[0].price, None);
    }

    #[test]
    fn junk_product_images_are_screened() {
        let raw = r#"{"products": [{"name": "Anvil", "images": [
            "https://cdn.acme.com/anvil-hero.png",
            "https://tracking.example.com/pixel.gif",
            "https://acme.com/visa-badge.svg"
        ]}], "confidence": 0.7}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.products[0].images, vec!["https://cdn.acme.com/anvil-hero.png"]);
    }

    #[test]
    fn junk_assets_survive_normalization() {
        // Dropping them is the validator's call, not the parser's.
        let raw = r#"{"assets": [{"url": "https://acme.com/icon-cart.svg"}], "confidence": 0.6}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets[0].asset_type, "image");
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = r#"{"products": [{"name": "A", "confidence": 7.0}], "confidence": 1.5}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.products[0].confidence, 1.0);
    }

    #[test]
    fn missing_overall_confidence_falls_back_to_item_mean() {
        let raw = r#"{"features": [{"name": "A", "confidence": 0.4}, {"name": "B", "confidence": 0.8}]}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert!((result.confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn code_fences_are_stripped() {
        let raw = "```json\n{\"confidence\": 0.5}\n```";
        let result = parse_extraction(raw, "u").unwrap();
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn non_json_output_is_a_parse_error() {
        assert!(parse_extraction("I could not find any products.", "u").is_err());
    }

    #[test]
    fn pricing_without_model_is_dropped() {
        let raw = r#"{"pricing": {"tiers": []}, "confidence": 0.5}"#;
        let result = parse_extraction(raw, "u").unwrap();
        assert!(result.pricing.is_none());
    }

    #[test]
    fn pricing_tiers_parse() {
        let raw = r#"{"pricing": {"model": "subscription", "tiers": [
            {"name": "Starter", "price": 9, "period": "month", "features": ["a", "b"]},
            {"name": "Pro", "price": "29"}
        ], "currency": "USD", "confidence": 0.85}}"#;
        let result = parse_extraction(raw, "u").unwrap();
        let pricing = result.pricing.unwrap();
        assert_eq!(pricing.tiers.len(), 2);
        assert_eq!(pricing.tiers[1].price, Some(29.0));
        assert_eq!(pricing.tiers[0].features.len(), 2);
    }
}
